//! Implementation of the `lockprobe parse` command.
//!
//! Re-parses a status dump captured earlier, for example one written with
//! `run --dump-dir`, without touching a server.

use crate::cli::ParseArgs;
use crate::config::OutputFormat;
use crate::error::{LockProbeError, Result};
use crate::output::render_report;
use crate::status::StatusParser;
use std::io::Read;

pub fn cmd_parse(args: ParseArgs) -> Result<()> {
    let dump = read_dump(&args.file)?;
    print!("{}", render(&dump, &args.table, args.format)?);
    Ok(())
}

fn read_dump(file: &str) -> Result<String> {
    if file == "-" {
        let mut dump = String::new();
        std::io::stdin()
            .read_to_string(&mut dump)
            .map_err(|e| LockProbeError::UserError(format!("failed to read stdin: {}", e)))?;
        return Ok(dump);
    }

    std::fs::read_to_string(file).map_err(|e| {
        LockProbeError::UserError(format!("failed to read status dump '{}': {}", file, e))
    })
}

fn render(dump: &str, table: &str, format: OutputFormat) -> Result<String> {
    let report = StatusParser::new(table)?.parse(dump);

    match format {
        OutputFormat::Text => Ok(render_report(&report)),
        OutputFormat::Json => serde_json::to_string(&report)
            .map(|line| line + "\n")
            .map_err(|e| {
                LockProbeError::OutputError(format!("failed to serialize report to JSON: {}", e))
            }),
    }
}
