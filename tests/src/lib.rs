//! End-to-end chaos scenarios against in-memory container and cluster clients.

pub mod mock;
