//! # Chaos Error Taxonomy
//!
//! Every failure a chaos command can produce, split by the phase it happened in.
//!
//! * Construction: [`ChaosError::InvalidPattern`], [`ChaosError::Config`].
//! * Run time: [`ChaosError::ListFailed`], [`ChaosError::ApplyFailed`],
//!   [`ChaosError::RevertFailed`].
//!
//! An empty candidate list is **not** an error and has no variant here.

use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum ChaosError {
    /// The `re2:` argument did not compile.
    #[error("invalid target pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Malformed interval/duration, duration longer than interval, bad parameter.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The client could not enumerate candidate targets.
    #[error("failed to list targets: {source}")]
    ListFailed {
        #[source]
        source: BoxedSource,
    },

    /// The mutation never took effect on `target`.
    #[error("failed to apply {action} to '{target}': {source}")]
    ApplyFailed {
        target: String,
        action: String,
        #[source]
        source: BoxedSource,
    },

    /// The mutation took effect on `target` but could not be undone.
    #[error("failed to revert {action} on '{target}': {source}")]
    RevertFailed {
        target: String,
        action: String,
        #[source]
        source: BoxedSource,
    },
}

impl ChaosError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn list_failed(err: anyhow::Error) -> Self {
        Self::ListFailed { source: err.into() }
    }

    pub fn apply_failed(target: &str, action: &str, err: anyhow::Error) -> Self {
        Self::ApplyFailed {
            target: target.to_string(),
            action: action.to_string(),
            source: err.into(),
        }
    }

    pub fn revert_failed(target: &str, action: &str, err: anyhow::Error) -> Self {
        Self::RevertFailed {
            target: target.to_string(),
            action: action.to_string(),
            source: err.into(),
        }
    }

    /// Name of the target a run-time error is attributed to, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::ApplyFailed { target, .. } | Self::RevertFailed { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Short phase label used in log fields.
    pub fn phase(&self) -> &'static str {
        match self {
            Self::InvalidPattern { .. } | Self::Config(_) => "construct",
            Self::ListFailed { .. } => "list",
            Self::ApplyFailed { .. } => "apply",
            Self::RevertFailed { .. } => "revert",
        }
    }
}
