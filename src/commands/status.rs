use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::analyze::{default_db_path, load_stored_runs, open_store, stored_schema_version};
use crate::model::AnalyzeRunManifest;
use crate::util::read_json;

const RECENT_RUN_LIMIT: usize = 5;

pub fn run(args: StatusArgs) -> Result<()> {
    let manifest_dir = args.cache_root.join("manifests");
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| default_db_path(&args.cache_root));

    info!(cache_root = %args.cache_root.display(), "status requested");

    match latest_manifest(&manifest_dir)? {
        Some(path) => {
            let manifest: AnalyzeRunManifest = read_json(&path)?;
            info!(
                path = %path.display(),
                run_id = %manifest.run_id,
                status = %manifest.status,
                started_at = %manifest.started_at,
                updated_at = %manifest.updated_at,
                facts = manifest.counts.fact_count,
                chunks = manifest.counts.chunk_count,
                clusters = manifest.counts.cluster_count,
                conflicts = manifest.counts.conflicting_clusters,
                unit_mixing = manifest.counts.unit_mixing_clusters,
                normalization_failures = manifest.counts.normalization_failures,
                gap_items_found = manifest.counts.gap_items_found,
                gap_items_expected = manifest.counts.gap_items_expected,
                report = %manifest.paths.report_path,
                warnings = manifest.warnings.len(),
                "latest analysis manifest"
            );
        }
        None => warn!(path = %manifest_dir.display(), "no analysis manifests found"),
    }

    if db_path.exists() {
        let connection = open_store(&db_path)?;
        let schema_version = stored_schema_version(&connection)?.unwrap_or_default();
        let runs = load_stored_runs(&connection, RECENT_RUN_LIMIT)?;
        info!(
            path = %db_path.display(),
            schema_version = %schema_version,
            runs_listed = runs.len(),
            "database status"
        );
        for run in &runs {
            info!(
                run_id = %run.run_id,
                started_at = %run.started_at,
                facts = run.fact_count,
                clusters = run.cluster_count,
                conflicts = run.conflicting_clusters,
                unit_mixing = run.unit_mixing_clusters,
                coverage = run.overall_coverage.unwrap_or_default(),
                "stored run"
            );
        }
    } else {
        warn!(path = %db_path.display(), "database missing");
    }

    Ok(())
}

/// Run ids start with a fixed-width UTC timestamp, so the lexically greatest name is the newest.
fn latest_manifest(manifest_dir: &Path) -> Result<Option<PathBuf>> {
    if !manifest_dir.exists() {
        return Ok(None);
    }

    let mut latest: Option<PathBuf> = None;
    for entry in fs::read_dir(manifest_dir)
        .with_context(|| format!("failed to read {}", manifest_dir.display()))?
    {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !name.starts_with("analyze-") || !name.ends_with(".json") {
            continue;
        }
        if latest
            .as_ref()
            .and_then(|current| current.file_name())
            .is_none_or(|current| current.to_string_lossy().as_ref() < name)
        {
            latest = Some(path);
        }
    }

    Ok(latest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_manifest_picks_newest_analyze_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in [
            "analyze-20260101T000000000000Z-0a1b2c3d.json",
            "analyze-20260301T000000000001Z-ffffffff.json",
            "analyze-20260301T000000000000Z-00000000.json",
            "zz-other.json",
        ] {
            fs::write(dir.path().join(name), b"{}").expect("write");
        }

        let latest = latest_manifest(dir.path()).expect("scan").expect("found");
        assert_eq!(
            latest.file_name().and_then(|name| name.to_str()),
            Some("analyze-20260301T000000000001Z-ffffffff.json")
        );
    }

    #[test]
    fn missing_manifest_dir_is_not_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(
            latest_manifest(&dir.path().join("absent"))
                .expect("scan")
                .is_none()
        );
    }

    #[test]
    fn status_on_empty_cache_succeeds() {
        let dir = tempfile::tempdir().expect("tempdir");
        run(StatusArgs {
            cache_root: dir.path().to_path_buf(),
            db_path: None,
        })
        .expect("status");
        assert!(!default_db_path(dir.path()).exists());
    }
}
