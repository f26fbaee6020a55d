//! Config loading, overrides, and validation.

use super::model::Config;
use super::types::{SettleStrategy, StatementPair};
use crate::error::{LockProbeError, Result};
use std::path::Path;

/// Values given on the command line that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub table: Option<String>,
    pub delay_ms: Option<u64>,
    pub strategy: Option<SettleStrategy>,
    pub drop_fixture: bool,
    /// Replaces the configured pairs when non-empty.
    pub pairs: Vec<StatementPair>,
}

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(LockProbeError::UserError)` - Read error, parse error, or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            LockProbeError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load from `path` when given, otherwise start from defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml).map_err(|e| {
            LockProbeError::UserError(format!("failed to parse config YAML: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            LockProbeError::UserError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Apply command-line overrides, then re-validate.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Result<()> {
        let conn = &mut self.connection;
        if let Some(url) = &overrides.url {
            conn.url = Some(url.clone());
        }
        if let Some(host) = &overrides.host {
            conn.host = host.clone();
        }
        if let Some(port) = overrides.port {
            conn.port = port;
        }
        if let Some(user) = &overrides.user {
            conn.user = user.clone();
        }
        if let Some(password) = &overrides.password {
            conn.password = password.clone();
        }
        if let Some(database) = &overrides.database {
            conn.database = database.clone();
        }

        if let Some(table) = &overrides.table {
            self.table = table.clone();
        }
        if let Some(delay_ms) = overrides.delay_ms {
            self.settle.delay_ms = delay_ms;
        }
        if let Some(strategy) = overrides.strategy {
            self.settle.strategy = strategy;
        }
        if overrides.drop_fixture {
            self.drop_fixture_on_exit = true;
        }
        if !overrides.pairs.is_empty() {
            self.pairs = overrides.pairs.clone();
        }

        self.validate()
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `table` must be a plain identifier
    /// - `connection.port` must be non-zero
    /// - `pairs` must be non-empty and contain no blank statements
    /// - `settle.poll_interval_ms` must be positive with the `poll` strategy
    pub fn validate(&self) -> Result<()> {
        validate_table_name(&self.table)?;

        if self.connection.url.is_none() && self.connection.port == 0 {
            return Err(LockProbeError::UserError(
                "config validation failed: connection.port must be greater than 0".to_string(),
            ));
        }

        if self.pairs.is_empty() {
            return Err(LockProbeError::UserError(
                "config validation failed: pairs must contain at least one statement".to_string(),
            ));
        }

        for (index, pair) in self.pairs.iter().enumerate() {
            if pair.primary.trim().is_empty() || pair.secondary.trim().is_empty() {
                return Err(LockProbeError::UserError(format!(
                    "config validation failed: pair #{} has an empty statement",
                    index
                )));
            }
        }

        if self.settle.strategy == SettleStrategy::Poll && self.settle.poll_interval_ms == 0 {
            return Err(LockProbeError::UserError(
                "config validation failed: settle.poll_interval_ms must be greater than 0 with the poll strategy"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

/// Check that a table name can be spliced into DDL without quoting.
pub fn validate_table_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(LockProbeError::UserError(format!(
            "config validation failed: table '{}' must be a plain identifier ([A-Za-z_][A-Za-z0-9_]*)",
            name
        )))
    }
}
