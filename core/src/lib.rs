//! # Havoc Engine
//!
//! The engine behind `havoc`, a chaos testing tool for containers and cluster workloads.
//!
//! ## Layers
//! * **[`client`]**: Traits for the container runtime and the cluster API, plus
//!   implementations that drive the `docker` and `kubectl` binaries.
//! * **[`chaos`]**: Concrete perturbations (kill, stop, pause, remove, netem, scale to zero).
//! * **[`command`]**: Adapters turning a perturbation into something the scheduler can run.
//! * **[`lifecycle`]**: The apply, hold and revert state machine.
//! * **[`batch`]**: Sequential fail-fast execution over the selected targets.
//! * **[`scheduler`]**: Single-shot and interval execution with graceful cancellation.

pub mod batch;
pub mod chaos;
pub mod client;
pub mod command;
pub mod lifecycle;
pub mod scheduler;

pub use command::{ChaosCommand, OneShotCommand, RevertibleCommand};
pub use scheduler::{Job, schedule, schedule_all};
