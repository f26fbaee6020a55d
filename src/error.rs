//! Error types for the lockprobe CLI.
//!
//! Uses thiserror for derive macros. Statement-level failures are carried as
//! [`QueryError`], the two-session protocol wraps them in [`ProtocolError`]
//! together with the phase they happened in, and [`LockProbeError`] is what
//! commands return to `main`.

use crate::exit_codes;
use std::fmt;
use thiserror::Error;

/// A single statement, status fetch, or rollback failed on one session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("query `{sql}` failed: {message}")]
pub struct QueryError {
    /// The SQL text that was sent.
    pub sql: String,
    /// Server or driver message.
    pub message: String,
}

impl QueryError {
    pub fn new(sql: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            message: message.into(),
        }
    }
}

/// Phase of one lock observation, used to attribute failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Session 1 runs the primary statement.
    Acquire,
    /// Session 2 runs the secondary statement.
    Contend,
    /// Session 2 rolls back after its statement returned.
    ContendRollback,
    /// Session 1 fetches the engine status.
    Sample,
    /// Session 1 rolls back, releasing its locks.
    Release,
}

impl Phase {
    /// Whether this phase only releases locks after the real work.
    pub fn is_rollback(self) -> bool {
        matches!(self, Phase::Release | Phase::ContendRollback)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Acquire => write!(f, "acquire"),
            Phase::Contend => write!(f, "contend"),
            Phase::ContendRollback => write!(f, "contend rollback"),
            Phase::Sample => write!(f, "sample"),
            Phase::Release => write!(f, "release"),
        }
    }
}

/// Failure of one lock observation.
///
/// `source` is the primary failure. Failures that happened afterwards,
/// including best-effort rollbacks, are kept in `additional` in the order
/// they were observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolError {
    pub phase: Phase,
    pub source: QueryError,
    pub additional: Vec<(Phase, QueryError)>,
}

impl ProtocolError {
    pub fn new(phase: Phase, source: QueryError) -> Self {
        Self {
            phase,
            source,
            additional: Vec::new(),
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} phase failed: {}", self.phase, self.source)?;
        for (phase, err) in &self.additional {
            write!(f, "; additionally {} phase failed: {}", phase, err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Main error type for lockprobe operations.
#[derive(Error, Debug)]
pub enum LockProbeError {
    /// Invalid arguments or configuration.
    #[error("{0}")]
    UserError(String),

    /// A database session could not be established.
    #[error("Connection failed: {0}")]
    ConnectionError(String),

    /// A statement outside the observation protocol failed (fixture setup).
    #[error(transparent)]
    QueryError(#[from] QueryError),

    /// An observed pair failed; the remaining pairs were not run.
    #[error("pair #{index} ({pair}) failed: {source}")]
    PairFailed {
        index: usize,
        pair: String,
        #[source]
        source: ProtocolError,
    },

    /// Writing a report or a raw dump failed.
    #[error("Output failed: {0}")]
    OutputError(String),
}

impl LockProbeError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LockProbeError::UserError(_) => exit_codes::USER_ERROR,
            LockProbeError::ConnectionError(_) => exit_codes::CONNECTION_FAILURE,
            LockProbeError::QueryError(_) => exit_codes::QUERY_FAILURE,
            LockProbeError::PairFailed { .. } => exit_codes::QUERY_FAILURE,
            LockProbeError::OutputError(_) => exit_codes::USER_ERROR,
        }
    }
}

/// Result type alias for lockprobe operations.
pub type Result<T> = std::result::Result<T, LockProbeError>;
