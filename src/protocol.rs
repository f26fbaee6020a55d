//! Two-session lock observation protocol.
//!
//! ```text
//! session 1                                 session 2
//! ---------                                 ---------
//! acquire: run primary (takes locks)
//!     |
//!     +------------------+------------------------+
//!     |                                           |
//! settle (sleep or poll)                    contend: run secondary
//! sample: SHOW ENGINE INNODB STATUS           (blocks on session 1's locks)
//! release: ROLLBACK  ---- unblocks ---->    returns
//!     |                                     ROLLBACK
//!     +------------------+------------------------+
//!                        |
//!                join, return the sampled dump
//! ```
//!
//! Both branches are polled by one `tokio::join!` on the caller's task. The
//! contend branch is polled first, so the secondary statement has been sent
//! before the settle timer starts. Nothing guarantees the server has actually
//! parked session 2 by the time the sample is taken: with a short delay the
//! dump may show no waiter at all. That outcome is reported, not treated as a
//! failure.

use crate::config::{SettleConfig, SettleStrategy, StatementPair};
use crate::error::{Phase, ProtocolError, QueryError};
use crate::session::Session;
#[cfg(test)]
use crate::status::LockReport;
use crate::status::StatusParser;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

/// Runs observations with one settle configuration and one fixture table.
#[derive(Debug, Clone)]
pub struct Observer {
    settle: SettleConfig,
    parser: StatusParser,
}

impl Observer {
    pub fn new(settle: SettleConfig, parser: StatusParser) -> Self {
        Self { settle, parser }
    }

    pub fn parser(&self) -> &StatusParser {
        &self.parser
    }

    /// Produce the lock report for one pair, discarding the raw dump.
    #[cfg(test)]
    pub async fn observe<H, C>(
        &self,
        holder: &mut H,
        contender: &mut C,
        pair: &StatementPair,
    ) -> Result<LockReport, ProtocolError>
    where
        H: Session + ?Sized,
        C: Session + ?Sized,
    {
        let dump = self.capture(holder, contender, pair).await?;
        Ok(self.parser.parse(&dump))
    }

    /// Run the protocol for one pair and return the raw status dump.
    ///
    /// On success both sessions have been rolled back. If the primary
    /// statement fails nothing else is attempted and nothing is rolled back.
    pub async fn capture<H, C>(
        &self,
        holder: &mut H,
        contender: &mut C,
        pair: &StatementPair,
    ) -> Result<String, ProtocolError>
    where
        H: Session + ?Sized,
        C: Session + ?Sized,
    {
        debug!(sql = %pair.primary, "acquire");
        holder
            .execute(&pair.primary)
            .await
            .map_err(|e| ProtocolError::new(Phase::Acquire, e))?;

        let (contended, sampled) = tokio::join!(
            contend(contender, &pair.secondary),
            self.settle_and_sample(holder),
        );

        join_branches(contended, sampled)
    }

    /// Settle, sample the status, then release session 1.
    ///
    /// The rollback is attempted even if sampling failed, since session 2
    /// stays blocked until it happens.
    async fn settle_and_sample<H>(&self, holder: &mut H) -> Branch<String>
    where
        H: Session + ?Sized,
    {
        let mut failures = Vec::new();

        let dump = match self.sample(holder).await {
            Ok(dump) => Some(dump),
            Err(e) => {
                failures.push((Phase::Sample, e));
                None
            }
        };

        debug!("release");
        if let Err(e) = holder.rollback().await {
            failures.push((Phase::Release, e));
        }

        Branch {
            value: dump,
            failures,
        }
    }

    async fn sample<H>(&self, holder: &mut H) -> Result<String, QueryError>
    where
        H: Session + ?Sized,
    {
        match self.settle.strategy {
            SettleStrategy::Fixed => {
                sleep(self.settle.delay()).await;
                let dump = holder.fetch_status().await?;
                debug!(
                    delay_ms = self.settle.delay_ms,
                    waiter = self.parser.parse(&dump).has_waiter(),
                    "sample"
                );
                Ok(dump)
            }
            SettleStrategy::Poll => self.poll_for_waiter(holder).await,
        }
    }

    /// Sample repeatedly until the dump shows a waiting transaction or the
    /// settle window closes; the last dump is returned either way.
    async fn poll_for_waiter<H>(&self, holder: &mut H) -> Result<String, QueryError>
    where
        H: Session + ?Sized,
    {
        let started = Instant::now();
        let deadline = started + self.settle.delay();
        let mut samples = 0u32;

        loop {
            let dump = holder.fetch_status().await?;
            samples += 1;

            if self.parser.parse(&dump).has_waiter() {
                debug!(samples, elapsed = ?started.elapsed(), "sample: waiter observed");
                return Ok(dump);
            }

            let now = Instant::now();
            if now >= deadline {
                debug!(samples, "sample: settle window closed without a waiter");
                return Ok(dump);
            }

            sleep(self.settle.poll_interval().min(deadline - now)).await;
        }
    }
}

/// Outcome of one concurrent branch: its value, if produced, and every
/// failure in the order it happened.
struct Branch<T> {
    value: Option<T>,
    failures: Vec<(Phase, QueryError)>,
}

/// Run the secondary statement, then roll session 2 back regardless.
async fn contend<C>(contender: &mut C, sql: &str) -> Branch<()>
where
    C: Session + ?Sized,
{
    let mut failures = Vec::new();

    debug!(sql, "contend");
    let value = match contender.execute(sql).await {
        Ok(()) => Some(()),
        Err(e) => {
            failures.push((Phase::Contend, e));
            None
        }
    };

    if let Err(e) = contender.rollback().await {
        failures.push((Phase::ContendRollback, e));
    }

    Branch { value, failures }
}

/// Combine both branches.
///
/// A failed statement or status fetch is the primary error, with the sampling
/// branch's failure ahead of the contender's. A rollback failure is primary
/// only when nothing else failed. Everything else is attached to it in the
/// order it happened.
fn join_branches(contended: Branch<()>, sampled: Branch<String>) -> Result<String, ProtocolError> {
    let (rollbacks, mut failures): (Vec<_>, Vec<_>) = sampled
        .failures
        .into_iter()
        .chain(contended.failures)
        .partition(|(phase, _)| phase.is_rollback());
    failures.extend(rollbacks);

    let mut failures = failures.into_iter();
    match failures.next() {
        None => sampled.value.ok_or_else(|| {
            // A sampling branch without failures always carries a dump.
            ProtocolError::new(
                Phase::Sample,
                QueryError::new(crate::session::STATUS, "no status was captured"),
            )
        }),
        Some((phase, source)) => {
            let additional: Vec<_> = failures.collect();
            for (phase, err) in &additional {
                warn!(%phase, error = %err, "additional failure during observation");
            }
            Err(ProtocolError {
                phase,
                source,
                additional,
            })
        }
    }
}
