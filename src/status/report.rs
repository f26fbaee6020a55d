//! Structured result of parsing one status dump.

use serde::{Deserialize, Serialize};

/// Locks observed in one status dump.
///
/// Each field holds the raw lock description text copied out of the dump.
/// A field is `None` when no matching transaction was found; that is a valid
/// outcome, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockReport {
    /// Lock descriptions of the first non-waiting transaction holding a lock
    /// on the fixture table.
    pub holding: Option<String>,

    /// Lock request of the first transaction waiting for a lock.
    pub waiting_for: Option<String>,
}

impl LockReport {
    /// Whether the dump showed a transaction blocked on a lock.
    pub fn has_waiter(&self) -> bool {
        self.waiting_for.is_some()
    }

    /// Whether both fields have been found.
    pub fn is_complete(&self) -> bool {
        self.holding.is_some() && self.waiting_for.is_some()
    }
}
