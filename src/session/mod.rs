//! Database sessions used by the lock observation protocol.
//!
//! A [`Session`] is one connection with auto-commit disabled, so a
//! transaction is implicitly open from the first statement until the next
//! `ROLLBACK` or `COMMIT`. The protocol only needs three operations from it;
//! everything else about the connection stays behind this trait.

use crate::error::QueryError;
use async_trait::async_trait;

mod mysql;

pub use mysql::MysqlSession;

/// Statement used to release a session's locks between observations.
pub const ROLLBACK: &str = "ROLLBACK";

/// Statement producing the engine's diagnostic dump.
pub const STATUS: &str = "SHOW ENGINE INNODB STATUS";

#[async_trait]
pub trait Session: Send {
    /// Execute a statement, discarding any result set.
    ///
    /// May block inside the server for as long as the statement waits on a
    /// lock held by another session.
    async fn execute(&mut self, sql: &str) -> Result<(), QueryError>;

    /// Fetch the current `SHOW ENGINE INNODB STATUS` text.
    async fn fetch_status(&mut self) -> Result<String, QueryError>;

    /// Roll back the open transaction, releasing every lock it holds.
    async fn rollback(&mut self) -> Result<(), QueryError> {
        self.execute(ROLLBACK).await
    }
}
