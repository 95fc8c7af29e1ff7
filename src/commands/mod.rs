pub mod analyze;
pub mod gaps;
pub mod inputs;
pub mod status;
pub mod tables;
