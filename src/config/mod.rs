//! Configuration model for lockprobe.
//!
//! This module defines the Config struct read from the YAML file given with
//! `--config`. It supports forward-compatible YAML parsing (unknown fields are
//! ignored), defaults for every field, CLI overrides, and validation.

mod model;
mod operations;
pub mod types;


// Re-export public API
pub use model::Config;
pub use operations::{ConfigOverrides, validate_table_name};
pub use types::{
    ConnectionConfig, FixtureRow, OutputFormat, SettleConfig, SettleStrategy, StatementPair,
};
