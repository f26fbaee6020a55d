//! Runs statement pairs through the observation protocol, one at a time.
//!
//! Pairs are strictly sequential: both sessions must be rolled back before
//! the next pair starts, and the fixture rows seen by pair *i+1* depend on
//! what pair *i* did. The first failing pair stops the run; reports already
//! emitted stay valid.

use crate::config::StatementPair;
use crate::dumps::write_dump;
use crate::error::{LockProbeError, Result};
use crate::output::{Observation, ReportSink};
use crate::protocol::Observer;
use crate::session::Session;
use std::path::PathBuf;
use tracing::{Instrument, debug, info, info_span};

/// Counts for a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Pairs observed.
    pub observed: usize,
    /// Pairs whose dump showed a waiting transaction.
    pub with_waiter: usize,
}

pub struct Sequencer {
    observer: Observer,
    dump_dir: Option<PathBuf>,
}

impl Sequencer {
    pub fn new(observer: Observer) -> Self {
        Self {
            observer,
            dump_dir: None,
        }
    }

    /// Also keep every raw dump under `dir`.
    pub fn with_dump_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.dump_dir = dir;
        self
    }

    /// Observe every pair in order, emitting each report to `sink`.
    ///
    /// Returns `PairFailed` for the first pair whose observation fails; later
    /// pairs are not attempted.
    pub async fn run<H, C>(
        &self,
        holder: &mut H,
        contender: &mut C,
        pairs: &[StatementPair],
        sink: &mut dyn ReportSink,
    ) -> Result<RunSummary>
    where
        H: Session + ?Sized,
        C: Session + ?Sized,
    {
        let mut summary = RunSummary::default();
        debug!(
            table = self.observer.parser().table(),
            pairs = pairs.len(),
            "observing pairs"
        );

        for (index, pair) in pairs.iter().enumerate() {
            let dump = self
                .observer
                .capture(holder, contender, pair)
                .instrument(info_span!("pair", index))
                .await
                .map_err(|source| LockProbeError::PairFailed {
                    index,
                    pair: pair.to_string(),
                    source,
                })?;

            let report = self.observer.parser().parse(&dump);
            let observation = Observation {
                index,
                pair: pair.clone(),
                report,
                dump,
            };

            if let Some(dir) = &self.dump_dir {
                let path = write_dump(dir, index, &observation.dump)?;
                debug!(index, path = %path.display(), "dump written");
            }

            sink.emit(&observation)?;

            summary.observed += 1;
            if observation.report.has_waiter() {
                summary.with_waiter += 1;
            }
            info!(
                index,
                holding = observation.report.holding.is_some(),
                waiting = observation.report.has_waiter(),
                complete = observation.report.is_complete(),
                "pair observed"
            );
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SettleConfig, StatementPair};
    use crate::error::Phase;
    use crate::status::StatusParser;
    use crate::test_support::FakeEngine;
    use tempfile::TempDir;

    fn sequencer() -> Sequencer {
        let observer = Observer::new(SettleConfig::default(), StatusParser::new("test").unwrap());
        Sequencer::new(observer)
    }

    #[tokio::test(start_paused = true)]
    async fn test_reports_in_input_order() {
        let engine = FakeEngine::new();
        let mut s1 = engine.session(1);
        let mut s2 = engine.session(2);
        let pairs = vec![
            StatementPair::same("DELETE FROM test WHERE pri = 4"),
            StatementPair::new("UPDATE test SET non = 99 WHERE pri = 4", "SELECT 1"),
        ];

        let mut reports: Vec<Observation> = Vec::new();
        let summary = sequencer()
            .run(&mut s1, &mut s2, &pairs, &mut reports)
            .await
            .unwrap();

        assert_eq!(summary, RunSummary { observed: 2, with_waiter: 1 });
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].index, 0);
        assert_eq!(reports[0].pair, pairs[0]);
        assert!(reports[0].report.is_complete());
        assert_eq!(reports[1].index, 1);
        assert!(reports[1].report.holding.as_deref().unwrap().contains("trx id 101"));
        assert_eq!(reports[1].report.waiting_for, None);
        assert!(!engine.is_locked());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_pair_stops_the_run() {
        let engine = FakeEngine::new();
        let mut s1 = engine.session(1).failing_on("DELETE FROM tset WHERE pri = 4");
        let mut s2 = engine.session(2);
        let pairs = vec![
            StatementPair::same("DELETE FROM tset WHERE pri = 4"),
            StatementPair::same("UPDATE test SET non = 99 WHERE pri = 4"),
        ];

        let mut reports: Vec<Observation> = Vec::new();
        let err = sequencer()
            .run(&mut s1, &mut s2, &pairs, &mut reports)
            .await
            .unwrap_err();

        match err {
            LockProbeError::PairFailed { index, pair, source } => {
                assert_eq!(index, 0);
                assert_eq!(pair, "DELETE FROM tset WHERE pri = 4");
                assert_eq!(source.phase, Phase::Acquire);
            }
            other => panic!("expected PairFailed, got {other:?}"),
        }

        assert!(reports.is_empty());
        assert!(engine.log().iter().all(|l| !l.contains("UPDATE")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_earlier_reports_survive_later_failure() {
        let engine = FakeEngine::new();
        let mut s1 = engine.session(1).failing_on("DELETE FROM test WHERE sec = 5");
        let mut s2 = engine.session(2);
        let pairs = vec![
            StatementPair::same("DELETE FROM test WHERE pri = 4"),
            StatementPair::same("DELETE FROM test WHERE sec = 5"),
            StatementPair::same("DELETE FROM test"),
        ];

        let mut reports: Vec<Observation> = Vec::new();
        let err = sequencer()
            .run(&mut s1, &mut s2, &pairs, &mut reports)
            .await
            .unwrap_err();

        assert!(matches!(err, LockProbeError::PairFailed { index: 1, .. }));
        assert_eq!(reports.len(), 1);
        assert!(!engine.log().contains(&"s1: DELETE FROM test".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dumps_are_written_when_requested() {
        let engine = FakeEngine::new();
        let mut s1 = engine.session(1);
        let mut s2 = engine.session(2);
        let temp = TempDir::new().unwrap();
        let pairs = vec![StatementPair::same("DELETE FROM test WHERE pri = 4")];

        let mut reports: Vec<Observation> = Vec::new();
        sequencer()
            .with_dump_dir(Some(temp.path().to_path_buf()))
            .run(&mut s1, &mut s2, &pairs, &mut reports)
            .await
            .unwrap();

        let written = std::fs::read_to_string(temp.path().join("pair-000.txt")).unwrap();
        assert_eq!(written, reports[0].dump);
        assert!(written.contains("---TRANSACTION 101"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_pair_list_is_a_no_op() {
        let engine = FakeEngine::new();
        let mut s1 = engine.session(1);
        let mut s2 = engine.session(2);

        let mut reports: Vec<Observation> = Vec::new();
        let summary = sequencer()
            .run(&mut s1, &mut s2, &[], &mut reports)
            .await
            .unwrap();

        assert_eq!(summary, RunSummary::default());
        assert!(engine.log().is_empty());
    }
}
