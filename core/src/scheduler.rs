//! Recurring execution of chaos commands.
//!
//! Ticks of one command never overlap: the next tick is only awaited after the
//! previous one returned. The ticker is anchored at the first run, so a tick whose
//! hold used up the whole interval is followed by the next one straight away.

use std::sync::Arc;
use std::time::Duration;

use havoc_common::ChaosError;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::command::ChaosCommand;

/// Runs `command` once, or every `interval` until `abort` is cancelled.
///
/// Cancellation is a graceful stop and yields `Ok(())`. The first failing tick
/// ends the loop and its error is returned.
pub async fn schedule(
    abort: &CancellationToken,
    command: &dyn ChaosCommand,
    interval: Option<Duration>,
    random: bool,
) -> Result<(), ChaosError> {
    // cancelled on return so nothing derived from this run outlives it
    let scope = abort.child_token();
    let _guard = scope.clone().drop_guard();
    let name = command.name();

    let Some(period) = interval else {
        debug!(command = name, "running once");
        return run_tick(&scope, command, random).await;
    };

    info!(command = name, interval = ?period, "scheduling recurring chaos");
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        run_tick(&scope, command, random).await?;

        tokio::select! {
            biased;
            _ = scope.cancelled() => {
                info!(command = name, "chaos command stopped");
                return Ok(());
            }
            _ = ticker.tick() => {}
        }
    }
}

async fn run_tick(
    abort: &CancellationToken,
    command: &dyn ChaosCommand,
    random: bool,
) -> Result<(), ChaosError> {
    debug!(command = command.name(), "tick");
    command.run(abort, random).await.inspect_err(|err| {
        error!(command = command.name(), phase = err.phase(), "error running chaos command: {err}");
    })
}

/// One command with its cadence, for [`schedule_all`].
pub struct Job {
    pub command: Arc<dyn ChaosCommand>,
    pub interval: Option<Duration>,
    pub random: bool,
}

/// Schedules independent commands concurrently. They share only `abort`.
///
/// A failing command does not stop the others; the first error observed is
/// returned once every job has finished.
pub async fn schedule_all(abort: &CancellationToken, jobs: Vec<Job>) -> Result<(), ChaosError> {
    let mut set: JoinSet<Result<(), ChaosError>> = JoinSet::new();
    for job in jobs {
        let abort = abort.clone();
        set.spawn(async move {
            schedule(&abort, job.command.as_ref(), job.interval, job.random).await
        });
    }

    let mut first_err: Option<ChaosError> = None;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                first_err.get_or_insert(err);
            }
            Err(join_err) => {
                error!("chaos job panicked: {join_err}");
                first_err.get_or_insert(ChaosError::config(format!("chaos job failed: {join_err}")));
            }
        }
    }

    first_err.map_or(Ok(()), Err)
}
