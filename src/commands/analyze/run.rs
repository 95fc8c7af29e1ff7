use super::*;

pub fn run(args: AnalyzeArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();

    let mut config = load_engine_config(args.config.as_deref())?;
    if let Some(tolerance) = args.tolerance {
        config.conflict_tolerance = tolerance;
    }
    let engine = compile_engine(&config)?;
    let config_sha256 = sha256_bytes(
        &serde_json::to_vec(&config).context("failed to serialize engine configuration")?,
    );

    let facts = load_facts(&args.facts)?;
    let chunks = load_chunks(&args.chunks)?;
    let inputs = vec![
        input_entry(&args.facts, facts.len())?,
        input_entry(&args.chunks, chunks.len())?,
    ];

    let mut digests = vec![config_sha256.as_str()];
    digests.extend(inputs.iter().map(|entry| entry.sha256.as_str()));
    let run_id = analyze_run_id(started_ts, &digests);

    let cache_root = args.cache_root.clone();
    let manifest_dir = cache_root.join("manifests");
    let report_dir = cache_root.join("reports");
    ensure_directory(&manifest_dir)?;
    ensure_directory(&report_dir)?;

    let report_path = args
        .report_path
        .clone()
        .unwrap_or_else(|| report_dir.join(format!("{run_id}.json")));
    let manifest_path = args
        .manifest_path
        .clone()
        .unwrap_or_else(|| manifest_dir.join(format!("{run_id}.json")));
    let db_path = if args.no_persist {
        None
    } else {
        Some(
            args.db_path
                .clone()
                .unwrap_or_else(|| default_db_path(&cache_root)),
        )
    };

    info!(cache_root = %cache_root.display(), run_id = %run_id, "starting analysis");

    let report = run_engine(&engine, &facts, &chunks, args.workers)?;
    write_json_pretty(&report_path, &report)?;
    let report_sha256 = sha256_file(&report_path)?;
    info!(path = %report_path.display(), sha256 = %report_sha256, "wrote analysis report");

    if let Some(db_path) = db_path.as_deref() {
        let mut connection = open_store(db_path)?;
        let persisted = persist_run(
            &mut connection,
            &RunRecord {
                run_id: &run_id,
                started_at: &started_at,
                report_sha256: &report_sha256,
            },
            &report,
        )?;
        info!(
            path = %db_path.display(),
            clusters = persisted.clusters,
            observations = persisted.observations,
            gap_items = persisted.gap_items,
            "persisted analysis run"
        );
    }

    let warnings = collect_warnings(&report);
    for warning in &warnings {
        warn!(warning = %warning, "analysis warning");
    }

    let manifest = AnalyzeRunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        status: "completed".to_string(),
        started_at,
        updated_at: now_utc_string(),
        command: std::env::args().collect::<Vec<String>>().join(" "),
        workers: args.workers,
        config_sha256,
        report_sha256,
        inputs,
        paths: AnalyzePaths {
            cache_root: cache_root.display().to_string(),
            report_path: report_path.display().to_string(),
            manifest_path: manifest_path.display().to_string(),
            db_path: db_path.as_ref().map(|path| path.display().to_string()),
            config_path: args.config.as_ref().map(|path| path.display().to_string()),
        },
        counts: counts_from_report(&report),
        warnings,
    };

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote run manifest");
    info!(
        run_id = %run_id,
        clusters = report.summary.cluster_count,
        conflicts = report.summary.conflicting_clusters,
        unit_mixing = report.summary.unit_mixing_clusters,
        tolerance = engine.tolerance(),
        coverage = report.gap_report.overall_coverage.unwrap_or_default(),
        "analysis completed"
    );

    Ok(())
}

/// `analyze-<UTC to the microsecond>-<digest prefix>`. Fixed width, so ids
/// sort by start time. The suffix covers config, inputs and process.
pub(super) fn analyze_run_id(started_ts: DateTime<Utc>, digests: &[&str]) -> String {
    let seed = format!("{}:{}", digests.join(":"), std::process::id());
    let suffix = sha256_bytes(seed.as_bytes());
    format!(
        "analyze-{}-{}",
        utc_compact_micros_string(started_ts),
        &suffix[..RUN_ID_SUFFIX_LEN]
    )
}

pub(super) fn run_engine(
    engine: &Engine,
    facts: &[FactObservation],
    chunks: &[DocumentChunk],
    workers: Option<usize>,
) -> Result<AnalysisReport> {
    let Some(workers) = workers else {
        return Ok(engine.run(facts, chunks));
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .context("failed to build worker pool")?;
    Ok(pool.install(|| engine.run(facts, chunks)))
}

fn input_entry(path: &Path, record_count: usize) -> Result<InputFileEntry> {
    Ok(InputFileEntry {
        path: path.display().to_string(),
        sha256: sha256_file(path)?,
        record_count,
    })
}

pub(super) fn counts_from_report(report: &AnalysisReport) -> AnalyzeCounts {
    AnalyzeCounts {
        fact_count: report.summary.fact_count,
        chunk_count: report.summary.chunk_count,
        cluster_count: report.summary.cluster_count,
        conflicting_clusters: report.summary.conflicting_clusters,
        unit_mixing_clusters: report.summary.unit_mixing_clusters,
        normalization_failures: report.summary.normalization_failures,
        gap_items_expected: report.gap_report.expected_total,
        gap_items_found: report.gap_report.found_total,
    }
}

pub(super) fn collect_warnings(report: &AnalysisReport) -> Vec<String> {
    let mut warnings = Vec::new();
    let summary = &report.summary;

    if summary.fact_count == 0 {
        warnings.push("no fact observations supplied".to_string());
    }
    if summary.chunk_count == 0 {
        warnings.push("no document chunks supplied; every checklist item is missing".to_string());
    }
    if summary.normalization_failures > 0 {
        warnings.push(format!(
            "{} facts had units that could not be normalized",
            summary.normalization_failures
        ));
    }
    if summary.malformed_values > 0 {
        warnings.push(format!(
            "{} quantity facts had non-numeric values and were compared as text",
            summary.malformed_values
        ));
    }

    warnings
}

pub fn default_db_path(cache_root: &Path) -> PathBuf {
    cache_root.join(DEFAULT_DB_FILENAME)
}
