use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::engine::{Engine, EngineConfig, EngineConfigOverrides};
use crate::model::{DocumentChunk, FactObservation};
use crate::util::read_json;

/// Built-in tables, with the override file applied when one is given.
pub fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };

    let overrides: EngineConfigOverrides =
        read_json(path).with_context(|| format!("invalid engine config {}", path.display()))?;
    info!(
        path = %path.display(),
        tolerance = overrides.conflict_tolerance.is_some(),
        unit_table = overrides.unit_conversion_table.is_some(),
        context_patterns = overrides.context_patterns.is_some(),
        checklist = overrides.checklist.is_some(),
        stoplist = overrides.name_stoplist.is_some(),
        "loaded engine config overrides"
    );
    Ok(EngineConfig::with_overrides(overrides))
}

pub fn compile_engine(config: &EngineConfig) -> Result<Engine> {
    config
        .compile()
        .context("failed to compile engine configuration")
}

pub fn load_facts(path: &Path) -> Result<Vec<FactObservation>> {
    let facts: Vec<FactObservation> = read_json(path)?;
    info!(path = %path.display(), facts = facts.len(), "loaded fact observations");
    Ok(facts)
}

pub fn load_chunks(path: &Path) -> Result<Vec<DocumentChunk>> {
    let chunks: Vec<DocumentChunk> = read_json(path)?;
    info!(path = %path.display(), chunks = chunks.len(), "loaded document chunks");
    Ok(chunks)
}
