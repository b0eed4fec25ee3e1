use tracing::warn;

use exprflow_core::{ComputeError, Operator, TaskInfo};

/// Evaluate a task's operation over its two operands.
pub fn evaluate(task: &TaskInfo) -> Result<f64, ComputeError> {
    let op: Operator = task.operation.parse()?;
    op.apply(task.arg1, task.arg2)
}

/// Evaluate, substituting `0.0` when the operation cannot be computed.
pub fn evaluate_or_zero(task: &TaskInfo) -> f64 {
    evaluate(task).unwrap_or_else(|e| {
        warn!(task_id = task.id, error = %e, "compute error, reporting 0");
        0.0
    })
}
