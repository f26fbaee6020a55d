//! Core status dump parsing logic.

use crate::error::{LockProbeError, Result};
use regex::Regex;

use super::report::LockReport;

/// Start of each transaction section in the TRANSACTIONS part of the dump.
const TRANSACTION_MARKER: &str = "---TRANSACTION ";

/// Heading of the section that follows the last transaction.
const FILE_IO_MARKER: &str = "FILE I/O";

/// Tail of the `------- TRX HAS BEEN WAITING n SEC FOR THIS LOCK TO BE GRANTED:` line.
const WAIT_MARKER: &str = "SEC FOR THIS LOCK TO BE GRANTED:";

/// Line that closes the waiting-lock subsection of a transaction.
const SECTION_SEPARATOR: &str = "------------------";

/// Parser for `SHOW ENGINE INNODB STATUS` output, bound to one fixture table.
#[derive(Debug, Clone)]
pub struct StatusParser {
    table: String,
    lock_pattern: Regex,
}

impl StatusParser {
    /// Build a parser matching lock lines on the given table.
    ///
    /// The table name matches exactly: InnoDB prints tables as
    /// `` `schema`.`table` ``, and the closing backtick is part of the pattern.
    pub fn new(table: &str) -> Result<Self> {
        let pattern = format!(r"(?:TABLE|RECORD) LOCK.*\.`{}`", regex::escape(table));
        let lock_pattern = Regex::new(&pattern).map_err(|e| {
            LockProbeError::UserError(format!("invalid lock pattern for table '{}': {}", table, e))
        })?;

        Ok(Self {
            table: table.to_string(),
            lock_pattern,
        })
    }

    /// Name of the fixture table this parser matches.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Extract held and awaited locks from a status dump.
    ///
    /// Transactions are scanned in dump order. The first waiting transaction
    /// provides `waiting_for`, and later waiters are ignored even when its
    /// extract is empty. The first non-waiting transaction with a lock line
    /// on the fixture table provides `holding`. Scanning stops once both are
    /// known, so a later holder never replaces an earlier one.
    pub fn parse(&self, dump: &str) -> LockReport {
        let mut report = LockReport::default();
        // Set by the first waiting transaction, even when its extract is empty.
        let mut waiter_seen = false;

        // Everything before the first marker is preamble.
        for block in dump.split(TRANSACTION_MARKER).skip(1) {
            let block = truncate_block(block);

            if let Some(pos) = block.find(WAIT_MARKER) {
                // A waiting transaction is never considered a holder.
                if !waiter_seen {
                    waiter_seen = true;
                    report.waiting_for = extract_waiting(block, pos);
                }
            } else if report.holding.is_none()
                && let Some(m) = self.lock_pattern.find(block)
            {
                report.holding = Some(block[m.start()..].to_string());
            }

            if waiter_seen && report.holding.is_some() {
                break;
            }
        }

        report
    }
}

/// Cut a transaction block at the section following the transaction list.
///
/// Only the last transaction carries trailing sections; the dashed line
/// heading them is dropped along with the line breaks around it.
pub(super) fn truncate_block(block: &str) -> &str {
    match block.find(FILE_IO_MARKER) {
        Some(pos) => strip_trailing_separator(&block[..pos]),
        None => block,
    }
}

fn strip_trailing_separator(text: &str) -> &str {
    let trimmed = text.trim_end_matches(['\n', '\r']);
    let (head, last_line) = match trimmed.rfind('\n') {
        Some(nl) => (&trimmed[..nl], &trimmed[nl + 1..]),
        None => ("", trimmed),
    };

    if is_separator_line(last_line) {
        head.trim_end_matches(['\n', '\r'])
    } else {
        trimmed
    }
}

fn is_separator_line(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && line.chars().all(|c| c == '-')
}

/// Text of the awaited lock: the lines after the wait marker line, up to the
/// closing separator.
pub(super) fn extract_waiting(block: &str, marker_pos: usize) -> Option<String> {
    let after = &block[marker_pos + WAIT_MARKER.len()..];
    let after = match after.find('\n') {
        Some(nl) => &after[nl + 1..],
        None => "",
    };

    let end = after.find(SECTION_SEPARATOR).unwrap_or(after.len());
    let text = after[..end].trim_end_matches(['\n', '\r']);

    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
