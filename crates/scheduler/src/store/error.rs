use thiserror::Error;

use exprflow_core::{TaskId, TaskStatus};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("task {0} not found")]
    NotFound(TaskId),

    #[error("task {id} is {status:?}, expected in_progress")]
    StateConflict { id: TaskId, status: TaskStatus },
}
