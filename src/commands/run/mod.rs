//! Implementation of the `lockprobe run` command.
//!
//! # What `lockprobe run` does
//!
//! 1. Loads the config and applies command-line overrides
//! 2. Opens two sessions with auto-commit disabled
//! 3. Creates the lock monitor table (if `lock_monitor` is set)
//! 4. Recreates and fills the fixture table
//! 5. Observes every pair in order, printing each report as it is produced
//! 6. Tears down: rolls both sessions back, drops the lock monitor table,
//!    drops the fixture (if requested), and disconnects
//!
//! Teardown also runs when a pair fails. Teardown failures are logged and
//! never replace the error that stopped the run.

use super::load_config;
use crate::cli::RunArgs;
use crate::config::Config;
use crate::error::Result;
use crate::fixture;
use crate::output::{ReportSink, sink_for};
use crate::protocol::Observer;
use crate::sequencer::{RunSummary, Sequencer};
use crate::session::{MysqlSession, Session};
use crate::status::StatusParser;
use tracing::{info, warn};

pub async fn cmd_run(args: RunArgs) -> Result<()> {
    let config = load_config(&args.source)?;

    let observer = Observer::new(config.settle, StatusParser::new(&config.table)?);
    let sequencer = Sequencer::new(observer).with_dump_dir(args.dump_dir);

    info!(
        server = %config.connection.describe(),
        table = %config.table,
        pairs = config.pairs.len(),
        "starting run"
    );

    let mut holder = MysqlSession::connect(&config.connection, "session1").await?;
    let mut contender = match MysqlSession::connect(&config.connection, "session2").await {
        Ok(session) => session,
        Err(err) => {
            disconnect(holder).await;
            return Err(err);
        }
    };

    let mut sink = sink_for(args.format, std::io::stdout());
    let result = observe_all(&config, &sequencer, &mut holder, &mut contender, sink.as_mut()).await;

    disconnect(holder).await;
    disconnect(contender).await;

    let summary = result?;
    info!(
        observed = summary.observed,
        with_waiter = summary.with_waiter,
        "run complete"
    );
    Ok(())
}

/// Prepare the server, run every pair, and tear down on both sessions.
pub(crate) async fn observe_all<H, C>(
    config: &Config,
    sequencer: &Sequencer,
    holder: &mut H,
    contender: &mut C,
    sink: &mut dyn ReportSink,
) -> Result<RunSummary>
where
    H: Session + ?Sized,
    C: Session + ?Sized,
{
    let result = match prepare(config, holder).await {
        Ok(()) => sequencer.run(holder, contender, &config.pairs, sink).await,
        Err(err) => Err(err),
    };

    teardown(config, holder, contender).await;
    result
}

async fn prepare<S>(config: &Config, session: &mut S) -> Result<()>
where
    S: Session + ?Sized,
{
    if config.lock_monitor {
        fixture::enable_lock_monitor(session).await?;
    }
    fixture::setup(session, &config.table, &config.fixture_rows).await
}

/// Best-effort cleanup. Every step is attempted; failures are only logged.
async fn teardown<H, C>(config: &Config, holder: &mut H, contender: &mut C)
where
    H: Session + ?Sized,
    C: Session + ?Sized,
{
    // Open transactions would block the DROP statements below.
    if let Err(err) = contender.rollback().await {
        warn!(error = %err, "teardown: session2 rollback failed");
    }
    if let Err(err) = holder.rollback().await {
        warn!(error = %err, "teardown: session1 rollback failed");
    }

    if config.lock_monitor
        && let Err(err) = fixture::disable_lock_monitor(holder).await
    {
        warn!(error = %err, "teardown: could not drop lock monitor table");
    }

    if config.drop_fixture_on_exit
        && let Err(err) = fixture::drop_fixture(holder, &config.table).await
    {
        warn!(error = %err, table = %config.table, "teardown: could not drop fixture table");
    }
}

async fn disconnect(session: MysqlSession) {
    if let Err(err) = session.disconnect().await {
        warn!(error = %err, "teardown: disconnect failed");
    }
}
