//! Concrete perturbations.
//!
//! Container actions go through a [`ContainerClient`](crate::client::ContainerClient),
//! workload scaling through a [`ClusterClient`](crate::client::ClusterClient).
//! Clients are injected at construction; nothing here holds global state.

mod container;
mod netem;
mod scale;

pub use container::{ContainerAction, ContainerChaos, DEFAULT_SIGNAL};
pub use netem::{Emulation, NetemChaos, DEFAULT_INTERFACE};
pub use scale::ScaleToZero;
