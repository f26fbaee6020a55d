//! In-memory stand-in for a server with row locking, used by protocol and
//! sequencer tests.
//!
//! The model is coarse: every `DELETE`, `UPDATE` or `INSERT`
//! takes one exclusive lock on the fixture table, and a session asking for it
//! while another session holds it parks until the holder rolls back or
//! commits. Other statements never lock. The status dump is rendered in the
//! shape the parser expects.

use crate::error::QueryError;
use crate::output::{Observation, ReportSink};
use crate::session::{ROLLBACK, STATUS, Session};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Default)]
struct EngineState {
    /// Session id and statement currently holding the table lock.
    holder: Option<(u8, String)>,
    /// Session id and statement parked on the lock.
    waiter: Option<(u8, String)>,
    /// Every call in arrival order, as `s<id>: <sql>`.
    log: Vec<String>,
}

pub(crate) struct FakeEngine {
    table: String,
    state: Mutex<EngineState>,
    released: Notify,
}

impl FakeEngine {
    pub(crate) fn new() -> Arc<Self> {
        Self::with_table("test")
    }

    pub(crate) fn with_table(table: &str) -> Arc<Self> {
        Arc::new(Self {
            table: table.to_string(),
            state: Mutex::new(EngineState::default()),
            released: Notify::new(),
        })
    }

    /// Open session `id` (1 or 2) on this engine.
    pub(crate) fn session(self: &Arc<Self>, id: u8) -> FakeSession {
        FakeSession {
            engine: Arc::clone(self),
            id,
            failing: HashSet::new(),
        }
    }

    /// Calls received so far, as `s<id>: <sql>`.
    pub(crate) fn log(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    pub(crate) fn is_locked(&self) -> bool {
        self.state.lock().unwrap().holder.is_some()
    }

    fn record(&self, id: u8, sql: &str) {
        self.state.lock().unwrap().log.push(format!("s{}: {}", id, sql));
    }

    fn render_status(&self) -> String {
        let state = self.state.lock().unwrap();
        let table = &self.table;
        let mut out = String::from(
            "=====================================\n\
             INNODB MONITOR OUTPUT\n\
             =====================================\n\
             ------------\n\
             TRANSACTIONS\n\
             ------------\n\
             LIST OF TRANSACTIONS FOR EACH SESSION:\n\
             ---TRANSACTION 0, not started\n\
             SHOW ENGINE INNODB STATUS\n",
        );

        if let Some((id, sql)) = &state.waiter {
            out.push_str(&format!(
                "---TRANSACTION 20{id}, ACTIVE 1 sec starting index read\n\
                 LOCK WAIT 2 lock struct(s), heap size 360, 1 row lock(s)\n\
                 {sql}\n\
                 ------- TRX HAS BEEN WAITING 1 SEC FOR THIS LOCK TO BE GRANTED:\n\
                 RECORD LOCKS space id 6 page no 3 n bits 72 index `PRIMARY` of table `test`.`{table}` trx id 20{id} lock_mode X locks rec but not gap waiting\n\
                 ------------------\n\
                 TABLE LOCK table `test`.`{table}` trx id 20{id} lock mode IX\n"
            ));
        }

        if let Some((id, sql)) = &state.holder {
            out.push_str(&format!(
                "---TRANSACTION 10{id}, ACTIVE 1 sec\n\
                 2 lock struct(s), heap size 360, 1 row lock(s)\n\
                 {sql}\n\
                 TABLE LOCK table `test`.`{table}` trx id 10{id} lock mode IX\n\
                 RECORD LOCKS space id 6 page no 3 n bits 72 index `PRIMARY` of table `test`.`{table}` trx id 10{id} lock_mode X locks rec but not gap\n"
            ));
        }

        out.push_str("--------\nFILE I/O\n--------\nEND OF INNODB MONITOR OUTPUT\n");
        out
    }
}

pub(crate) struct FakeSession {
    engine: Arc<FakeEngine>,
    id: u8,
    failing: HashSet<String>,
}

impl FakeSession {
    /// Make every call with this SQL text (or `STATUS`) fail on this session.
    pub(crate) fn failing_on(mut self, sql: &str) -> Self {
        self.failing.insert(sql.to_string());
        self
    }

    fn check(&self, sql: &str) -> Result<(), QueryError> {
        if self.failing.contains(sql) {
            Err(QueryError::new(sql, "injected failure"))
        } else {
            Ok(())
        }
    }

    fn release(&self) {
        let mut state = self.engine.state.lock().unwrap();
        if matches!(&state.holder, Some((id, _)) if *id == self.id) {
            state.holder = None;
        }
        drop(state);
        self.engine.released.notify_waiters();
    }
}

fn takes_lock(sql: &str) -> bool {
    let sql = sql.trim_start().to_ascii_uppercase();
    ["DELETE", "UPDATE", "INSERT"].iter().any(|verb| sql.starts_with(verb))
}

#[async_trait]
impl Session for FakeSession {
    async fn execute(&mut self, sql: &str) -> Result<(), QueryError> {
        self.engine.record(self.id, sql);
        self.check(sql)?;

        if sql == ROLLBACK || sql == "COMMIT" {
            self.release();
            return Ok(());
        }

        if !takes_lock(sql) {
            return Ok(());
        }

        loop {
            // Registered before the check so a release in between is not lost.
            let released = self.engine.released.notified();
            {
                let mut state = self.engine.state.lock().unwrap();
                let blocked = matches!(&state.holder, Some((id, _)) if *id != self.id);
                if !blocked {
                    state.holder = Some((self.id, sql.to_string()));
                    if matches!(&state.waiter, Some((id, _)) if *id == self.id) {
                        state.waiter = None;
                    }
                    return Ok(());
                }
                state.waiter = Some((self.id, sql.to_string()));
            }
            released.await;
        }
    }

    async fn fetch_status(&mut self) -> Result<String, QueryError> {
        self.engine.record(self.id, STATUS);
        self.check(STATUS)?;
        Ok(self.engine.render_status())
    }
}

/// Collects observations in memory.
impl ReportSink for Vec<Observation> {
    fn emit(&mut self, observation: &Observation) -> crate::error::Result<()> {
        self.push(observation.clone());
        Ok(())
    }
}
