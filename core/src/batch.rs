//! Sequential, fail-fast execution of one tick across all selected targets.
//!
//! In a revertible batch each target gets its own hold token, a child of the
//! tick's abort token. Every token handed out is recorded and cancelled when the
//! batch finishes, whatever the outcome, so no hold outlives the tick that created
//! it. One-shot batches hand out no tokens at all.

use havoc_common::ChaosError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::client::Descriptor;

pub struct Batch {
    abort: CancellationToken,
    holds: Vec<CancellationToken>,
}

impl Batch {
    pub fn new(abort: &CancellationToken) -> Self {
        Self {
            abort: abort.clone(),
            holds: Vec::new(),
        }
    }

    /// Runs `per_target` for every target in order, stopping at the first error.
    ///
    /// Each target is handed a fresh hold token. Targets after a failing one are
    /// left untouched. If the abort token fires, the target in progress finishes its
    /// own abort handling and the rest are skipped. Returns the number of targets
    /// processed successfully.
    pub async fn run<T, F, Fut>(
        &mut self,
        targets: Vec<T>,
        mut per_target: F,
    ) -> Result<usize, ChaosError>
    where
        T: Descriptor,
        F: FnMut(T, CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), ChaosError>>,
    {
        let abort = self.abort.clone();
        let outcome = drive(&abort, targets, |target| {
            let hold = self.record_hold();
            per_target(target, hold)
        })
        .await;
        self.release();
        outcome
    }

    /// Same ordering and fail-fast rules as [`Batch::run`] for actions that are
    /// never reverted. No hold token is recorded.
    pub async fn run_one_shot<T, F, Fut>(
        &mut self,
        targets: Vec<T>,
        per_target: F,
    ) -> Result<usize, ChaosError>
    where
        T: Descriptor,
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<(), ChaosError>>,
    {
        drive(&self.abort, targets, per_target).await
    }

    /// Hold tokens handed out so far.
    pub fn recorded(&self) -> usize {
        self.holds.len()
    }

    /// Hold tokens that have not been cancelled yet.
    pub fn outstanding(&self) -> usize {
        self.holds.iter().filter(|t| !t.is_cancelled()).count()
    }

    fn record_hold(&mut self) -> CancellationToken {
        let hold = self.abort.child_token();
        self.holds.push(hold.clone());
        hold
    }

    fn release(&mut self) {
        for hold in &self.holds {
            hold.cancel();
        }
    }
}

async fn drive<T, F, Fut>(
    abort: &CancellationToken,
    targets: Vec<T>,
    mut per_target: F,
) -> Result<usize, ChaosError>
where
    T: Descriptor,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<(), ChaosError>>,
{
    let total = targets.len();
    let mut processed: usize = 0;

    for target in targets {
        if abort.is_cancelled() {
            debug!(skipped = total - processed, "abort requested, skipping remaining targets");
            break;
        }

        let name = target.name().to_string();
        debug!(name = %name, "processing target");

        if let Err(err) = per_target(target).await {
            error!(name = %name, phase = err.phase(), "stopping batch: {err}");
            return Err(err);
        }
        processed += 1;
    }

    Ok(processed)
}

impl Drop for Batch {
    fn drop(&mut self) {
        self.release();
    }
}

/// Convenience wrapper running a fresh [`Batch`] to completion.
pub async fn run_batch<T, F, Fut>(
    abort: &CancellationToken,
    targets: Vec<T>,
    per_target: F,
) -> Result<usize, ChaosError>
where
    T: Descriptor,
    F: FnMut(T, CancellationToken) -> Fut,
    Fut: Future<Output = Result<(), ChaosError>>,
{
    let mut batch = Batch::new(abort);
    batch.run(targets, per_target).await
}
