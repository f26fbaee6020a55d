//! Report rendering.
//!
//! Two formats are supported:
//! - `text`: one block per pair, held locks followed by the blocked
//!   statement's lock request
//! - `json`: one JSON object per line (NDJSON), suitable for `jq`
//!
//! Each observation is written as soon as it is produced, so reports for
//! pairs that completed before a failure are never lost.

use crate::config::{OutputFormat, StatementPair};
use crate::error::{LockProbeError, Result};
use crate::status::LockReport;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

/// Rule printed above and below the statement in text output.
const RULE: &str = "----------------------------------------";

pub const NONE_HELD: &str = "none held";
pub const NONE_WAITING: &str = "none waiting";
pub const BLOCKED_LABEL: &str = "OTHER STATEMENT BLOCKED ON:";

/// Result of observing one statement pair.
#[derive(Debug, Clone)]
pub struct Observation {
    /// Position of the pair in the run, starting at 0.
    pub index: usize,
    pub pair: StatementPair,
    pub report: LockReport,
    /// Raw status text the report was parsed from.
    pub dump: String,
}

/// Destination for observations, in run order.
pub trait ReportSink {
    fn emit(&mut self, observation: &Observation) -> Result<()>;
}

/// Build the sink for a format over any writer.
pub fn sink_for<'a, W: Write + 'a>(format: OutputFormat, out: W) -> Box<dyn ReportSink + 'a> {
    match format {
        OutputFormat::Text => Box::new(TextSink::new(out)),
        OutputFormat::Json => Box::new(JsonSink::new(out)),
    }
}

/// Body of a text report: held locks, label, awaited lock.
pub fn render_report(report: &LockReport) -> String {
    format!(
        "{}\n{}\n\n{}\n",
        report.holding.as_deref().unwrap_or(NONE_HELD),
        BLOCKED_LABEL,
        report.waiting_for.as_deref().unwrap_or(NONE_WAITING),
    )
}

/// Full text block for one observation.
pub fn render_text(observation: &Observation) -> String {
    format!(
        "{rule}\n{pair}\n{rule}\n\n{body}",
        rule = RULE,
        pair = observation.pair,
        body = render_report(&observation.report),
    )
}

pub struct TextSink<W: Write> {
    out: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> ReportSink for TextSink<W> {
    fn emit(&mut self, observation: &Observation) -> Result<()> {
        writeln!(self.out, "{}", render_text(observation))
            .and_then(|_| self.out.flush())
            .map_err(|e| LockProbeError::OutputError(format!("failed to write report: {}", e)))
    }
}

/// One NDJSON line.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRecord<'a> {
    /// RFC3339 time the record was written.
    pub ts: DateTime<Utc>,
    /// `user@host` that ran the observation.
    pub actor: &'a str,
    pub index: usize,
    pub primary: &'a str,
    pub secondary: &'a str,
    pub holding: Option<&'a str>,
    pub waiting_for: Option<&'a str>,
}

impl<'a> ReportRecord<'a> {
    pub fn new(observation: &'a Observation, actor: &'a str) -> Self {
        Self {
            ts: Utc::now(),
            actor,
            index: observation.index,
            primary: &observation.pair.primary,
            secondary: &observation.pair.secondary,
            holding: observation.report.holding.as_deref(),
            waiting_for: observation.report.waiting_for.as_deref(),
        }
    }

    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            LockProbeError::OutputError(format!("failed to serialize report to JSON: {}", e))
        })
    }
}

pub struct JsonSink<W: Write> {
    out: W,
    actor: String,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            actor: actor_string(),
        }
    }
}

impl<W: Write> ReportSink for JsonSink<W> {
    fn emit(&mut self, observation: &Observation) -> Result<()> {
        let line = ReportRecord::new(observation, &self.actor).to_ndjson_line()?;
        writeln!(self.out, "{}", line)
            .and_then(|_| self.out.flush())
            .map_err(|e| LockProbeError::OutputError(format!("failed to write report: {}", e)))
    }
}

/// `USER@HOSTNAME` of the process, for record provenance.
fn actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}
