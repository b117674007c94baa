//! Types shared by the chaos engine and its command line: target resolution,
//! timing configuration and the error taxonomy.

pub mod config;
pub mod error;
pub mod target;
pub mod timing;

pub use error::ChaosError;
pub use target::{RE2_PREFIX, TargetSpec};
pub use timing::Timing;
