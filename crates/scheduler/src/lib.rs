//! Expression scheduling engine.
//!
//! An expression is parsed into an operator tree, every operator node whose
//! operands are known becomes a [`Task`], and completed tasks feed their value
//! back into the tree until the root resolves.
//!
//! - [`parser`]: text to [`Ast`]
//! - [`store`]: the task lifecycle contract and its in-memory engine
//! - [`runner`]: the [`Scheduler`] tying jobs, emission and propagation together

pub mod error;
pub mod metrics;
pub mod model;
pub mod parser;
pub mod runner;
pub mod store;
pub mod types;

pub use error::SchedulerError;
pub use metrics::SchedulerMetrics;
pub use model::{Ast, Job, NewTask, Node, NodeId, Task};
pub use parser::{parse, SyntaxError};
pub use runner::Scheduler;
pub use store::{MemoryTaskStore, StoreError, TaskCounts, TaskStore};
pub use types::SchedulerConfig;
