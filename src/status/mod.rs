//! Parsing of `SHOW ENGINE INNODB STATUS` output.
//!
//! The status dump is a loosely structured, human-oriented report covering
//! the whole server. This module extracts from it the two things a lock
//! observation cares about:
//! - the locks held on the fixture table by a transaction that is not waiting
//! - the lock request of the transaction that is blocked
//!
//! Parsing is pure and total: any input yields a [`LockReport`], possibly
//! with both fields absent.

mod parser;
mod report;


// Re-export public API
pub use parser::StatusParser;
pub use report::LockReport;
