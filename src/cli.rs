use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "esia-facts",
    version,
    about = "Canonical fact clustering, conflict checks and gap analysis for impact assessment documents"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Analyze(AnalyzeArgs),
    Gaps(GapsArgs),
    Tables(TablesArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    #[arg(long, default_value = ".cache/esia-facts")]
    pub cache_root: PathBuf,

    /// JSON array of fact observations.
    #[arg(long)]
    pub facts: PathBuf,

    /// JSON array of document chunks.
    #[arg(long)]
    pub chunks: PathBuf,

    /// Override file for tolerance, unit table, context patterns and checklist.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub report_path: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub no_persist: bool,

    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Size of a dedicated worker pool; the global pool is used when absent.
    #[arg(long)]
    pub workers: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct GapsArgs {
    #[arg(long)]
    pub chunks: PathBuf,

    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Writes to stdout when absent.
    #[arg(long)]
    pub report_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct TablesArgs {
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Writes to stdout when absent.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/esia-facts")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}
