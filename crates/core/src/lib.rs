pub mod config;
pub mod error;
pub mod operator;
pub mod signal;
pub mod wire;

pub use config::Config;
pub use error::ComputeError;
pub use operator::Operator;
pub use wire::*;

/// Unique identifier for a submitted expression job.
pub type JobId = u64;

/// Unique identifier for a single binary-operation task.
pub type TaskId = u64;
