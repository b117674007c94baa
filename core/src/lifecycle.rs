//! The **apply → hold → revert** state machine shared by every revertible perturbation.
//!
//! Once a mutation is applied, two independent signals are raced:
//!
//! * the hold token, cancelled when the operator aborts or the tick is torn down,
//! * a timer for the hold duration, which is *not* derived from the token.
//!
//! Whichever fires first triggers the revert. Revert calls never receive the
//! cancelled token, so undoing the mutation is still possible after an abort.

use std::time::Duration;

use havoc_common::ChaosError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::client::Descriptor;
use crate::command::Revertible;

/// States a single target moves through while a perturbation is held.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HoldState {
    Idle,
    Applied,
    RevertedOnAbort,
    RevertedOnTimeout,
    ApplyFailed,
    RevertFailed,
}

/// Applies `apply` to `target`, holds it for `duration`, then reverts with `revert`.
///
/// Returns the terminal state on success ([`HoldState::RevertedOnAbort`] or
/// [`HoldState::RevertedOnTimeout`]). Apply failures skip the revert entirely;
/// revert failures leave the mutation in place and are not retried.
///
/// With `dry_run` set neither backend call is made, but the hold race still runs.
pub async fn apply_then_hold<P>(
    hold: &CancellationToken,
    perturbation: &P,
    target: &P::Target,
    apply: &P::Payload,
    revert: &P::Payload,
    duration: Duration,
    dry_run: bool,
) -> Result<HoldState, ChaosError>
where
    P: Revertible + ?Sized,
{
    let name = target.name();
    let action = perturbation.action();
    let mut state = HoldState::Idle;
    debug!(name, action, ?state, "applying perturbation");

    if dry_run {
        info!(name, action, payload = ?apply, "dry run: skipping apply");
    } else if let Err(err) = perturbation.apply(target, apply).await {
        state = HoldState::ApplyFailed;
        error!(name, action, ?state, "failed to apply perturbation: {err:#}");
        return Err(ChaosError::apply_failed(name, action, err));
    }

    state = HoldState::Applied;
    debug!(name, action, ?state, hold = ?duration, "holding perturbation");

    let expiry = tokio::time::sleep(duration);
    tokio::pin!(expiry);

    state = tokio::select! {
        _ = hold.cancelled() => {
            debug!(name, action, "restoring previous state on abort");
            HoldState::RevertedOnAbort
        }
        _ = &mut expiry => {
            debug!(name, action, "restoring previous state on timeout");
            HoldState::RevertedOnTimeout
        }
    };

    if dry_run {
        info!(name, action, payload = ?revert, "dry run: skipping revert");
    } else if let Err(err) = perturbation.revert(target, revert).await {
        error!(name, action, state = ?HoldState::RevertFailed, "failed to revert perturbation: {err:#}");
        return Err(ChaosError::revert_failed(name, action, err));
    }

    debug!(name, action, ?state, "perturbation reverted");
    Ok(state)
}
