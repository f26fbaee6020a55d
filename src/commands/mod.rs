//! Command implementations for lockprobe.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations.

mod config_cmd;
mod parse;
mod run;

use crate::cli::{Command, ConfigSource};
use crate::config::Config;
use crate::error::Result;

/// Dispatch a command to its implementation.
pub async fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Run(args) => run::cmd_run(args).await,
        Command::Parse(args) => parse::cmd_parse(args),
        Command::Config(args) => config_cmd::cmd_config(args),
    }
}

/// Load the config file (or defaults) and apply command-line overrides.
fn load_config(source: &ConfigSource) -> Result<Config> {
    let mut config = Config::load_or_default(source.config.as_deref())?;
    config.apply_overrides(&source.overrides())?;
    Ok(config)
}
