use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{info, warn};

use crate::cli::AnalyzeArgs;
use crate::commands::inputs::{compile_engine, load_chunks, load_engine_config, load_facts};
use crate::engine::Engine;
use crate::model::{
    AnalysisReport, AnalyzeCounts, AnalyzePaths, AnalyzeRunManifest, DocumentChunk,
    FactObservation, FactType, InputFileEntry,
};
use crate::util::{
    ensure_directory, now_utc_string, sha256_bytes, sha256_file, utc_compact_micros_string,
    write_json_pretty,
};

const DB_SCHEMA_VERSION: &str = "0.1.0";
const DEFAULT_DB_FILENAME: &str = "esia_facts.sqlite";
const RUN_ID_SUFFIX_LEN: usize = 8;

mod run;
mod store;
#[cfg(test)]
mod tests;

pub use run::{default_db_path, run};
pub use store::{load_stored_runs, open_store, stored_schema_version};

use store::*;
