use anyhow::Result;
use tracing::info;

use crate::cli::TablesArgs;
use crate::commands::gaps::write_stdout_json;
use crate::commands::inputs::{compile_engine, load_engine_config};
use crate::util::write_json_pretty;

/// Dumps the effective configuration. The output is itself a valid override file.
pub fn run(args: TablesArgs) -> Result<()> {
    let config = load_engine_config(args.config.as_deref())?;
    compile_engine(&config)?;

    info!(
        tolerance = config.conflict_tolerance,
        unit_families = config.unit_conversion_table.families.len(),
        context_rules = config.context_patterns.len(),
        checklist_items = config.checklist.items.len(),
        stoplist = config.name_stoplist.len(),
        "effective engine tables"
    );

    match args.output.as_deref() {
        Some(path) => {
            write_json_pretty(path, &config)?;
            info!(path = %path.display(), "wrote engine tables");
        }
        None => write_stdout_json(&config)?,
    }

    Ok(())
}
