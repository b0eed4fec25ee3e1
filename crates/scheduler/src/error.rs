use thiserror::Error;

use exprflow_core::{JobId, TaskId, TaskStatus};

use crate::parser::SyntaxError;
use crate::store::StoreError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("invalid expression: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("job {0} not found")]
    JobNotFound(JobId),

    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    #[error("task {task_id} is {status:?}, expected in_progress")]
    StateConflict { task_id: TaskId, status: TaskStatus },

    #[error("task {task_id} exceeded {max_retries} retries; job {job_id} failed")]
    RetryLimitExceeded {
        task_id: TaskId,
        job_id: JobId,
        max_retries: u32,
    },

    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

impl From<StoreError> for SchedulerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => SchedulerError::TaskNotFound(id),
            StoreError::StateConflict { id, status } => {
                SchedulerError::StateConflict { task_id: id, status }
            }
        }
    }
}
