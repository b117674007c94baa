use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Cancels `abort` on the first SIGINT or SIGTERM.
///
/// Both handlers are installed before this returns, so a failure to listen is
/// reported to the caller instead of being mistaken for a signal. Running holds
/// are reverted through the token; a second signal is not handled specially,
/// the process simply waits for the reverts to finish.
#[cfg(unix)]
pub fn cancel_on_signal(abort: CancellationToken) -> anyhow::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate()).context("cannot listen for SIGTERM")?;
    let mut int = signal(SignalKind::interrupt()).context("cannot listen for SIGINT")?;

    tokio::spawn(async move {
        tokio::select! {
            Some(()) = term.recv() => {}
            Some(()) = int.recv() => {}
            else => return,
        }
        warn!("received shutdown signal, reverting and stopping");
        abort.cancel();
    });
    Ok(())
}

#[cfg(not(unix))]
pub fn cancel_on_signal(abort: CancellationToken) -> anyhow::Result<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("received shutdown signal, reverting and stopping");
                abort.cancel();
            }
            Err(err) => tracing::error!("cannot listen for ctrl-c, signals are ignored: {err}"),
        }
    });
    Ok(())
}
