use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::GapsArgs;
use crate::commands::inputs::{compile_engine, load_chunks, load_engine_config};
use crate::model::GapReport;
use crate::util::write_json_pretty;

pub fn run(args: GapsArgs) -> Result<()> {
    let config = load_engine_config(args.config.as_deref())?;
    let engine = compile_engine(&config)?;
    let chunks = load_chunks(&args.chunks)?;

    let report = engine.analyze_gaps(&chunks);
    log_coverage(&report);

    match args.report_path.as_deref() {
        Some(path) => {
            write_json_pretty(path, &report)?;
            info!(path = %path.display(), "wrote gap report");
        }
        None => write_stdout_json(&report)?,
    }

    Ok(())
}

fn log_coverage(report: &GapReport) {
    for section in &report.sections {
        let missing = section
            .items
            .iter()
            .filter(|item| !item.found)
            .map(|item| item.label.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        info!(
            section = %section.title,
            found = section.found_count,
            expected = section.expected_count,
            coverage = section.coverage.unwrap_or_default(),
            missing = %missing,
            "section coverage"
        );
    }
    info!(
        sections = report.sections_evaluated,
        found = report.found_total,
        expected = report.expected_total,
        coverage = report.overall_coverage.unwrap_or_default(),
        "gap analysis completed"
    );
}

pub(super) fn write_stdout_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, value).context("failed to write json to stdout")?;
    handle
        .write_all(b"\n")
        .context("failed to write json to stdout")?;
    Ok(())
}
