//! Shared plumbing for the carto crates: logging setup, metrics and small
//! response types used by more than one layer.

pub mod types;
pub mod utils;
pub mod metrics;
pub mod env;
