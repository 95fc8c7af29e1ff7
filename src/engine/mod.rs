//! Analytical core: unit normalization, context classification, signature
//! clustering, conflict and unit-mixing annotation, checklist gap analysis.
//! Nothing in here performs I/O.

pub mod cluster;
pub mod config;
pub mod conflict;
pub mod context;
pub mod error;
pub mod gaps;
pub mod pipeline;
pub mod signature;
pub mod unit_mixing;
pub mod units;
pub mod values;


pub use config::{EngineConfig, EngineConfigOverrides};
pub use pipeline::Engine;
