//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Configuration for a lockprobe run.
///
/// Loaded from a YAML file passed with `--config`; every field has a default,
/// so an empty file (or no file) reproduces the stock experiment against a
/// local server. Unknown fields in the YAML are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Server
    // =========================================================================
    /// Connection details used for both sessions.
    pub connection: ConnectionConfig,

    // =========================================================================
    // Fixture
    // =========================================================================
    /// Name of the fixture table (default: "test").
    #[serde(default = "default_table")]
    pub table: String,

    /// Rows inserted into the fixture table before the first pair.
    #[serde(default = "default_fixture_rows")]
    pub fixture_rows: Vec<FixtureRow>,

    /// Whether to create the `innodb_lock_monitor` table for the run.
    #[serde(default = "default_true")]
    pub lock_monitor: bool,

    /// Whether to drop the fixture table at the end of the run.
    #[serde(default)]
    pub drop_fixture_on_exit: bool,

    // =========================================================================
    // Protocol
    // =========================================================================
    /// When and how the engine status is sampled.
    pub settle: SettleConfig,

    /// Statement pairs, run in order.
    #[serde(default = "default_pairs")]
    pub pairs: Vec<StatementPair>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            table: default_table(),
            fixture_rows: default_fixture_rows(),
            lock_monitor: default_true(),
            drop_fixture_on_exit: false,
            settle: SettleConfig::default(),
            pairs: default_pairs(),
        }
    }
}
