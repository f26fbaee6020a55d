//! Fixture table and lock monitor setup.
//!
//! Everything here runs on one session outside the observation protocol, so
//! failures surface as plain [`QueryError`]s (exit code 3).

use crate::config::{FixtureRow, validate_table_name};
use crate::error::{QueryError, Result};
use crate::session::Session;
use tracing::{debug, warn};

/// While this table exists, InnoDB prints per-lock detail in its status.
pub const LOCK_MONITOR_TABLE: &str = "innodb_lock_monitor";

/// Servers from 5.7 on ignore the table and print lock detail only with this on.
pub const STATUS_OUTPUT_LOCKS_ON: &str = "SET GLOBAL innodb_status_output_locks = ON";
pub const STATUS_OUTPUT_LOCKS_OFF: &str = "SET GLOBAL innodb_status_output_locks = OFF";

/// Recreate the fixture table and fill it with `rows`, then commit.
pub async fn setup<S>(session: &mut S, table: &str, rows: &[FixtureRow]) -> Result<()>
where
    S: Session + ?Sized,
{
    validate_table_name(table)?;

    session
        .execute(&format!("DROP TABLE IF EXISTS {}", table))
        .await?;
    session
        .execute(&format!(
            "CREATE TABLE {} (pri INT NOT NULL, sec INT, non INT, PRIMARY KEY(pri), KEY(sec)) ENGINE=InnoDB",
            table
        ))
        .await?;

    if let Some(insert) = insert_statement(table, rows) {
        session.execute(&insert).await?;
    }
    session.execute("COMMIT").await?;

    debug!(table, rows = rows.len(), "fixture ready");
    Ok(())
}

/// Drop the fixture table.
pub async fn drop_fixture<S>(session: &mut S, table: &str) -> Result<()>
where
    S: Session + ?Sized,
{
    validate_table_name(table)?;
    session
        .execute(&format!("DROP TABLE IF EXISTS {}", table))
        .await?;
    debug!(table, "fixture dropped");
    Ok(())
}

pub async fn enable_lock_monitor<S>(session: &mut S) -> std::result::Result<(), QueryError>
where
    S: Session + ?Sized,
{
    session
        .execute(&format!("DROP TABLE IF EXISTS {}", LOCK_MONITOR_TABLE))
        .await?;
    session
        .execute(&format!("CREATE TABLE {} (a INT)", LOCK_MONITOR_TABLE))
        .await?;

    // Needs SUPER or SYSTEM_VARIABLES_ADMIN; older servers rely on the table alone.
    if let Err(err) = session.execute(STATUS_OUTPUT_LOCKS_ON).await {
        warn!(error = %err, "could not enable innodb_status_output_locks; held locks may be missing from reports");
    }

    debug!("lock monitor enabled");
    Ok(())
}

pub async fn disable_lock_monitor<S>(session: &mut S) -> std::result::Result<(), QueryError>
where
    S: Session + ?Sized,
{
    if let Err(err) = session.execute(STATUS_OUTPUT_LOCKS_OFF).await {
        warn!(error = %err, "could not disable innodb_status_output_locks");
    }

    session
        .execute(&format!("DROP TABLE IF EXISTS {}", LOCK_MONITOR_TABLE))
        .await?;
    debug!("lock monitor disabled");
    Ok(())
}

fn insert_statement(table: &str, rows: &[FixtureRow]) -> Option<String> {
    if rows.is_empty() {
        return None;
    }

    let values: Vec<String> = rows
        .iter()
        .map(|[pri, sec, non]| format!("({},{},{})", pri, sec, non))
        .collect();

    Some(format!("INSERT INTO {} VALUES {}", table, values.join(",")))
}
