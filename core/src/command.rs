//! # Chaos Command Abstraction
//!
//! A chaos command is anything the scheduler can run once per tick. Concrete
//! perturbations don't implement [`ChaosCommand`] themselves; they implement one
//! of two capability traits and get wrapped in the matching adapter:
//!
//! * [`OneShot`] (kill, stop, pause, remove) → [`OneShotCommand`]: list, apply, done.
//! * [`Revertible`] (netem, scale to zero) → [`RevertibleCommand`]: list, apply,
//!   hold, revert via [`apply_then_hold`].
//!
//! Both adapters share the per-tick flow: list live targets, optionally narrow to
//! a single random victim, then hand the list to the [`Batch`] executor.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use havoc_common::{ChaosError, Timing, target};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::batch::Batch;
use crate::client::Descriptor;
use crate::lifecycle::apply_then_hold;

/// A configured perturbation, immutable between ticks.
#[async_trait]
pub trait ChaosCommand: Send + Sync {
    /// Short label used in logs (e.g. `kill`, `netem delay`).
    fn name(&self) -> &str;

    /// Runs one tick. `abort` is the operator's cancellation signal.
    async fn run(&self, abort: &CancellationToken, random: bool) -> Result<(), ChaosError>;
}

/// A perturbation that is applied and never undone.
#[async_trait]
pub trait OneShot: Send + Sync {
    type Target: Descriptor + fmt::Debug + Send + Sync;

    fn action(&self) -> &str;

    async fn list_targets(&self) -> anyhow::Result<Vec<Self::Target>>;

    async fn apply(&self, target: &Self::Target) -> anyhow::Result<()>;
}

/// A perturbation with an exact inverse.
#[async_trait]
pub trait Revertible: Send + Sync {
    type Target: Descriptor + fmt::Debug + Send + Sync;
    type Payload: fmt::Debug + Send + Sync;

    fn action(&self) -> &str;

    async fn list_targets(&self) -> anyhow::Result<Vec<Self::Target>>;

    /// Builds the `(apply, revert)` pair for `target`.
    ///
    /// Called right before the apply, so implementations may capture live state
    /// for the revert payload.
    async fn payloads(&self, target: &Self::Target)
    -> anyhow::Result<(Self::Payload, Self::Payload)>;

    async fn apply(&self, target: &Self::Target, payload: &Self::Payload) -> anyhow::Result<()>;

    async fn revert(&self, target: &Self::Target, payload: &Self::Payload) -> anyhow::Result<()>;
}

/// Lists candidates and applies the random narrowing rule.
async fn select_targets<T, F>(
    command: &str,
    list: F,
    random: bool,
) -> Result<Vec<T>, ChaosError>
where
    T: fmt::Debug,
    F: Future<Output = anyhow::Result<Vec<T>>>,
{
    let candidates = list.await.map_err(ChaosError::list_failed)?;
    debug!(command, count = candidates.len(), "listed candidate targets");
    let targets = target::narrow(candidates, random);
    if targets.is_empty() {
        warn!(command, "no targets matched, nothing to do");
    }
    Ok(targets)
}

pub struct OneShotCommand<P> {
    perturbation: P,
    dry_run: bool,
}

impl<P: OneShot> OneShotCommand<P> {
    pub fn new(perturbation: P, dry_run: bool) -> Self {
        Self {
            perturbation,
            dry_run,
        }
    }
}

#[async_trait]
impl<P: OneShot> ChaosCommand for OneShotCommand<P> {
    fn name(&self) -> &str {
        self.perturbation.action()
    }

    async fn run(&self, abort: &CancellationToken, random: bool) -> Result<(), ChaosError> {
        let action = self.perturbation.action();
        let targets = select_targets(action, self.perturbation.list_targets(), random).await?;
        if targets.is_empty() {
            return Ok(());
        }

        let mut batch = Batch::new(abort);
        batch
            .run_one_shot(targets, |target| async move {
                let name = target.name();
                if self.dry_run {
                    info!(name, action, "dry run: skipping {action}");
                    return Ok(());
                }
                self.perturbation
                    .apply(&target)
                    .await
                    .map_err(|err| ChaosError::apply_failed(name, action, err))?;
                info!(name, action, "perturbation applied");
                Ok(())
            })
            .await
            .map(|_| ())
    }
}

pub struct RevertibleCommand<P> {
    perturbation: P,
    hold: Duration,
    dry_run: bool,
}

impl<P: Revertible> RevertibleCommand<P> {
    /// Wraps `perturbation`; fails if `timing` yields no usable hold duration.
    pub fn new(perturbation: P, timing: &Timing, dry_run: bool) -> Result<Self, ChaosError> {
        Ok(Self {
            perturbation,
            hold: timing.hold()?,
            dry_run,
        })
    }

    pub fn hold(&self) -> Duration {
        self.hold
    }
}

#[async_trait]
impl<P: Revertible> ChaosCommand for RevertibleCommand<P> {
    fn name(&self) -> &str {
        self.perturbation.action()
    }

    async fn run(&self, abort: &CancellationToken, random: bool) -> Result<(), ChaosError> {
        let action = self.perturbation.action();
        let targets = select_targets(action, self.perturbation.list_targets(), random).await?;
        if targets.is_empty() {
            return Ok(());
        }

        let mut batch = Batch::new(abort);
        batch
            .run(targets, |target, hold| async move {
                let (apply, revert) = self
                    .perturbation
                    .payloads(&target)
                    .await
                    .map_err(|err| ChaosError::apply_failed(target.name(), action, err))?;
                let state = apply_then_hold(
                    &hold,
                    &self.perturbation,
                    &target,
                    &apply,
                    &revert,
                    self.hold,
                    self.dry_run,
                )
                .await?;
                info!(name = target.name(), action, ?state, "perturbation completed");
                Ok(())
            })
            .await
            .map(|_| ())
    }
}
