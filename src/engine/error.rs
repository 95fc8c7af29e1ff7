use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-record unit resolution failure. Never fatal to a run.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum UnitUnresolved {
    #[error("unit missing")]
    Missing,

    #[error("unit '{unit}' is not in any conversion table")]
    Unrecognized { unit: String },

    #[error("unit '{unit}' matches several families: {}", families.join(", "))]
    Ambiguous { unit: String, families: Vec<String> },

    #[error("unit '{unit}' belongs to family '{found}', expected '{expected}'")]
    FamilyMismatch {
        unit: String,
        expected: String,
        found: String,
    },
}

/// Raised while compiling configuration, before any record is processed.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("conflict tolerance must be a finite non-negative number, got {0}")]
    InvalidTolerance(f64),

    #[error("invalid pattern for {owner}: {source}")]
    InvalidPattern {
        owner: String,
        #[source]
        source: regex::Error,
    },

    #[error("context '{context}' references unknown unit family '{family}'")]
    UnknownUnitFamily { context: String, family: String },

    #[error("unit '{unit}' in family '{family}' has invalid factor {factor}")]
    InvalidFactor {
        family: String,
        unit: String,
        factor: f64,
    },

    #[error("duplicate checklist item id '{0}'")]
    DuplicateChecklistItem(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
