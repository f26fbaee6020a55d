//! Lockprobe: observe the InnoDB locks taken by SQL statements.
//!
//! This is the main entry point for the `lockprobe` CLI. It parses arguments,
//! sets up logging, dispatches to the appropriate command handler, and
//! handles errors with proper exit codes.

mod cli;
mod commands;
pub mod config;
pub mod dumps;
pub mod error;
pub mod exit_codes;
pub mod fixture;
pub mod logging;
pub mod output;
pub mod protocol;
pub mod sequencer;
pub mod session;
pub mod status;

#[cfg(test)]
mod test_support;

use cli::Cli;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();
    logging::init_logging(cli.verbose);

    match commands::dispatch(cli.command).await {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            ExitCode::from(err.exit_code() as u8)
        }
    }
}
