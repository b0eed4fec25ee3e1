use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use exprflow_core::{FailRequest, ResultSubmission, TaskEnvelope, TaskId, TaskStatus};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const ANONYMOUS_AGENT: &str = "anonymous";

#[derive(Debug, Default, Deserialize)]
pub struct FetchTaskParams {
    pub agent_id: Option<String>,
}

/// Acknowledgement for result and failure reports.
#[derive(Debug, Serialize)]
pub struct TaskAck {
    pub id: TaskId,
    pub status: TaskStatus,
    pub retries: u32,
}

/// `GET /internal/task`: lease the next ready task, 404 when idle.
pub async fn fetch_task(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FetchTaskParams>,
) -> ApiResult<Json<TaskEnvelope>> {
    let agent_id = params.agent_id.as_deref().unwrap_or(ANONYMOUS_AGENT);
    match state.scheduler.lease_pending(agent_id)? {
        Some(task) => {
            debug!(task_id = task.id, agent = %agent_id, "handed out task");
            Ok(Json(TaskEnvelope { task: task.info() }))
        }
        None => Err(ApiError::not_found("no task available")),
    }
}

/// `POST /internal/task`: report a computed result.
pub async fn submit_result(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ResultSubmission>, JsonRejection>,
) -> ApiResult<Json<TaskAck>> {
    let Json(submission) = body.map_err(|e| ApiError::unprocessable(e.body_text()))?;
    let task = state.scheduler.complete(submission.id, submission.result)?;
    info!(task_id = task.id, job_id = task.job_id, result = submission.result, "result accepted");
    Ok(Json(TaskAck {
        id: task.id,
        status: task.status,
        retries: task.retries,
    }))
}

/// `POST /internal/task/fail`: give a leased task back for retry.
pub async fn fail_task(
    State(state): State<Arc<AppState>>,
    body: Result<Json<FailRequest>, JsonRejection>,
) -> ApiResult<Json<TaskAck>> {
    let Json(request) = body.map_err(|e| ApiError::unprocessable(e.body_text()))?;
    let task = state.scheduler.fail(request.id)?;
    Ok(Json(TaskAck {
        id: task.id,
        status: task.status,
        retries: task.retries,
    }))
}
