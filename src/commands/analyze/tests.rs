use std::fs;

use super::run::{analyze_run_id, collect_warnings, run_engine};
use super::*;
use crate::engine::EngineConfig;

fn observation(name: &str, value: f64, unit: Option<&str>, page: u32) -> FactObservation {
    FactObservation {
        name: name.to_string(),
        fact_type: FactType::Quantity,
        value_raw: format!("{value}"),
        value_num: Some(value),
        unit_raw: unit.map(str::to_string),
        evidence: format!("{name} of {value} reported on page {page}"),
        page,
    }
}

fn sample_facts() -> Vec<FactObservation> {
    vec![
        observation("Workforce", 500.0, None, 2),
        observation("workforce", 650.0, None, 80),
        observation("Study area", 1.2, Some("ha"), 3),
        observation("study area", 12_000.0, Some("m2"), 45),
        observation("Number of culverts", 12.0, Some("widgets"), 40),
    ]
}

fn sample_chunks() -> Vec<DocumentChunk> {
    vec![DocumentChunk {
        text: "The Environmental and Social Management Plan is provided in Annex C.".to_string(),
        page: 120,
    }]
}

fn sample_report() -> AnalysisReport {
    let engine = EngineConfig::default()
        .compile()
        .expect("default config compiles");
    engine.run(&sample_facts(), &sample_chunks())
}

fn memory_store() -> Connection {
    let connection = Connection::open_in_memory().expect("open in-memory db");
    connection
        .pragma_update(None, "foreign_keys", "ON")
        .expect("enable foreign keys");
    ensure_schema(&connection).expect("schema");
    connection
}

fn count(connection: &Connection, sql: &str) -> i64 {
    connection
        .query_row(sql, [], |row| row.get(0))
        .expect("count query")
}

#[test]
fn persist_run_writes_clusters_observations_and_gap_items() {
    let mut connection = memory_store();
    let report = sample_report();

    let counts = persist_run(
        &mut connection,
        &RunRecord {
            run_id: "analyze-1",
            started_at: "2026-01-01T00:00:00Z",
            report_sha256: "abc",
        },
        &report,
    )
    .expect("persist");

    assert_eq!(counts.clusters, report.clusters.len());
    assert_eq!(counts.observations, 5);
    assert_eq!(
        counts.gap_items,
        report
            .gap_report
            .sections
            .iter()
            .map(|section| section.items.len())
            .sum::<usize>()
    );
    assert_eq!(
        count(&connection, "SELECT COUNT(*) FROM observations"),
        5
    );
    assert_eq!(
        count(
            &connection,
            "SELECT COUNT(*) FROM clusters WHERE has_conflict = 1"
        ),
        report.summary.conflicting_clusters as i64
    );
    assert_eq!(
        count(&connection, "SELECT COUNT(*) FROM gap_items WHERE found = 1"),
        report.gap_report.found_total as i64
    );

    let failed: Option<String> = connection
        .query_row(
            "SELECT issues_json FROM observations WHERE unit_raw = 'widgets'",
            [],
            |row| row.get(0),
        )
        .expect("failed observation row");
    assert!(failed.expect("issues recorded").contains("unit_unresolved"));
}

#[test]
fn persist_run_replaces_an_existing_run() {
    let mut connection = memory_store();
    let report = sample_report();
    let record = RunRecord {
        run_id: "analyze-1",
        started_at: "2026-01-01T00:00:00Z",
        report_sha256: "abc",
    };

    persist_run(&mut connection, &record, &report).expect("first persist");
    persist_run(&mut connection, &record, &report).expect("second persist");

    assert_eq!(count(&connection, "SELECT COUNT(*) FROM runs"), 1);
    assert_eq!(
        count(&connection, "SELECT COUNT(*) FROM observations"),
        5
    );
}

#[test]
fn stored_runs_are_listed_newest_first() {
    let mut connection = memory_store();
    let report = sample_report();

    for (run_id, started_at) in [
        ("analyze-a", "2026-01-01T00:00:00Z"),
        ("analyze-b", "2026-03-01T00:00:00Z"),
        ("analyze-c", "2026-02-01T00:00:00Z"),
    ] {
        persist_run(
            &mut connection,
            &RunRecord {
                run_id,
                started_at,
                report_sha256: "abc",
            },
            &report,
        )
        .expect("persist");
    }

    let runs = load_stored_runs(&connection, 2).expect("load runs");
    let ids: Vec<&str> = runs.iter().map(|run| run.run_id.as_str()).collect();
    assert_eq!(ids, vec!["analyze-b", "analyze-c"]);
    assert_eq!(runs[0].fact_count, 5);
    assert_eq!(
        runs[0].conflicting_clusters,
        report.summary.conflicting_clusters as i64
    );
    assert_eq!(
        stored_schema_version(&connection).expect("version"),
        Some(DB_SCHEMA_VERSION.to_string())
    );
}

#[test]
fn warnings_cover_empty_inputs_and_failures() {
    let report = sample_report();
    let warnings = collect_warnings(&report);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("could not be normalized"));

    let engine = EngineConfig::default()
        .compile()
        .expect("default config compiles");
    let empty = engine.run(&[], &[]);
    let warnings = collect_warnings(&empty);
    assert!(warnings.iter().any(|w| w.contains("no fact observations")));
    assert!(warnings.iter().any(|w| w.contains("no document chunks")));
}

#[test]
fn dedicated_pool_matches_global_pool() {
    let engine = EngineConfig::default()
        .compile()
        .expect("default config compiles");
    let facts = sample_facts();
    let chunks = sample_chunks();

    let global = run_engine(&engine, &facts, &chunks, None).expect("global");
    let dedicated = run_engine(&engine, &facts, &chunks, Some(2)).expect("dedicated");
    assert_eq!(
        serde_json::to_value(&global).expect("json"),
        serde_json::to_value(&dedicated).expect("json")
    );
}

#[test]
fn run_writes_report_manifest_and_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let facts_path = dir.path().join("facts.json");
    let chunks_path = dir.path().join("chunks.json");
    let config_path = dir.path().join("config.json");
    write_json_pretty(&facts_path, &sample_facts()).expect("write facts");
    write_json_pretty(&chunks_path, &sample_chunks()).expect("write chunks");
    fs::write(&config_path, br#"{"conflict_tolerance": 0.5}"#).expect("write config");

    let cache_root = dir.path().join("cache");
    let report_path = dir.path().join("out").join("report.json");
    let manifest_path = dir.path().join("out").join("manifest.json");

    run(AnalyzeArgs {
        cache_root: cache_root.clone(),
        facts: facts_path,
        chunks: chunks_path,
        config: Some(config_path),
        report_path: Some(report_path.clone()),
        manifest_path: Some(manifest_path.clone()),
        db_path: None,
        no_persist: false,
        tolerance: None,
        workers: Some(1),
    })
    .expect("analyze run");

    let manifest: AnalyzeRunManifest =
        crate::util::read_json(&manifest_path).expect("manifest");
    assert_eq!(manifest.status, "completed");
    assert_eq!(manifest.inputs.len(), 2);
    assert_eq!(manifest.inputs[0].record_count, 5);
    assert_eq!(
        manifest.report_sha256,
        sha256_file(&report_path).expect("hash report")
    );

    let report: AnalysisReport = crate::util::read_json(&report_path).expect("report");
    assert_eq!(report.summary.conflict_tolerance, 0.5);
    // 500 vs 650 stays within a 50% tolerance.
    assert_eq!(report.summary.conflicting_clusters, 0);

    let connection = open_store(&default_db_path(&cache_root)).expect("open store");
    let runs = load_stored_runs(&connection, 10).expect("runs");
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].run_id, manifest.run_id);
}

#[test]
fn tolerance_flag_overrides_the_config_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let facts_path = dir.path().join("facts.json");
    let chunks_path = dir.path().join("chunks.json");
    let config_path = dir.path().join("config.json");
    write_json_pretty(&facts_path, &sample_facts()).expect("write facts");
    write_json_pretty(&chunks_path, &sample_chunks()).expect("write chunks");
    fs::write(&config_path, br#"{"conflict_tolerance": 0.5}"#).expect("write config");

    let cache_root = dir.path().join("cache");
    let report_path = dir.path().join("report.json");

    run(AnalyzeArgs {
        cache_root: cache_root.clone(),
        facts: facts_path,
        chunks: chunks_path,
        config: Some(config_path),
        report_path: Some(report_path.clone()),
        manifest_path: None,
        db_path: None,
        no_persist: true,
        tolerance: Some(0.02),
        workers: None,
    })
    .expect("analyze run");

    let report: AnalysisReport = crate::util::read_json(&report_path).expect("report");
    assert_eq!(report.summary.conflict_tolerance, 0.02);
    assert_eq!(report.summary.conflicting_clusters, 1);
    assert!(!default_db_path(&cache_root).exists());
}

#[test]
fn invalid_tolerance_fails_before_writing_outputs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let facts_path = dir.path().join("facts.json");
    let chunks_path = dir.path().join("chunks.json");
    write_json_pretty(&facts_path, &sample_facts()).expect("write facts");
    write_json_pretty(&chunks_path, &sample_chunks()).expect("write chunks");
    let report_path = dir.path().join("report.json");

    let err = run(AnalyzeArgs {
        cache_root: dir.path().join("cache"),
        facts: facts_path,
        chunks: chunks_path,
        config: None,
        report_path: Some(report_path.clone()),
        manifest_path: None,
        db_path: None,
        no_persist: true,
        tolerance: Some(-1.0),
        workers: None,
    })
    .expect_err("negative tolerance");

    assert!(format!("{err:#}").contains("tolerance"));
    assert!(!report_path.exists());
}

#[test]
fn run_ids_are_unique_within_one_second_and_sort_by_time() {
    let base = Utc::now();
    let later = base + chrono::Duration::microseconds(1);

    let first = analyze_run_id(base, &["config", "facts", "chunks"]);
    let second = analyze_run_id(later, &["config", "facts", "chunks"]);
    let other_inputs = analyze_run_id(base, &["config", "other-facts", "chunks"]);

    assert_ne!(first, second);
    assert_ne!(first, other_inputs);
    assert!(first < second);
    assert_eq!(first.len(), second.len());
    assert!(first.starts_with("analyze-"));
}

#[test]
fn back_to_back_runs_keep_separate_records() {
    let dir = tempfile::tempdir().expect("tempdir");
    let facts_path = dir.path().join("facts.json");
    let chunks_path = dir.path().join("chunks.json");
    write_json_pretty(&facts_path, &sample_facts()).expect("write facts");
    write_json_pretty(&chunks_path, &sample_chunks()).expect("write chunks");
    let cache_root = dir.path().join("cache");

    for _ in 0..2 {
        run(AnalyzeArgs {
            cache_root: cache_root.clone(),
            facts: facts_path.clone(),
            chunks: chunks_path.clone(),
            config: None,
            report_path: None,
            manifest_path: None,
            db_path: None,
            no_persist: false,
            tolerance: None,
            workers: None,
        })
        .expect("analyze run");
    }

    let manifests = fs::read_dir(cache_root.join("manifests"))
        .expect("manifest dir")
        .count();
    let reports = fs::read_dir(cache_root.join("reports"))
        .expect("report dir")
        .count();
    assert_eq!(manifests, 2);
    assert_eq!(reports, 2);

    let connection = open_store(&default_db_path(&cache_root)).expect("open store");
    let runs = load_stored_runs(&connection, 10).expect("runs");
    assert_eq!(runs.len(), 2);
    assert_ne!(runs[0].run_id, runs[1].run_id);
}
