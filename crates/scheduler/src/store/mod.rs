//! Task lifecycle storage.
//!
//! ```text
//! pending --lease--> in_progress --complete--> done
//!                    in_progress --fail------> pending (retries + 1)
//! ```

mod error;
mod memory;

pub use error::StoreError;
pub use memory::MemoryTaskStore;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use exprflow_core::{JobId, TaskId};

use crate::model::{NewTask, Task};

/// Number of tasks in each lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub done: usize,
}

/// Storage contract for tasks and their lifecycle transitions.
///
/// Callers serialize access; implementations need no internal locking.
pub trait TaskStore: Send {
    /// Store a new pending task at the tail of the queue.
    fn create_task(&mut self, task: NewTask) -> TaskId;

    /// Take the oldest pending task and lease it to `agent_id`.
    /// `None` means nothing is waiting.
    fn lease_pending(&mut self, agent_id: &str) -> Option<Task>;

    /// Mark an in-progress task done with `result`.
    fn complete(&mut self, id: TaskId, result: f64) -> Result<Task, StoreError>;

    /// Return an in-progress task to the queue tail and bump its retry counter.
    fn fail(&mut self, id: TaskId) -> Result<Task, StoreError>;

    fn get_task(&self, id: TaskId) -> Option<Task>;

    /// Whether any task of `job_id` is still pending or in progress.
    fn has_pending_tasks(&self, job_id: JobId) -> bool;

    /// In-progress tasks leased before `now - ttl`, oldest lease first.
    fn expired_leases(&self, now: DateTime<Utc>, ttl: Duration) -> Vec<TaskId>;

    /// Drop every unfinished task of `job_id`. Returns how many were dropped.
    fn discard_job(&mut self, job_id: JobId) -> usize;

    fn counts(&self) -> TaskCounts;
}
