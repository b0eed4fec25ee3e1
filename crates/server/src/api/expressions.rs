use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use exprflow_core::{JobEnvelope, JobId, JobList, SubmitExpressionRequest, SubmittedJob};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// `POST /api/v1/calculate`
pub async fn calculate(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SubmitExpressionRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SubmittedJob>)> {
    let Json(request) = body.map_err(|e| ApiError::new(e.status(), e.body_text()))?;
    let submitted = state.scheduler.submit(&request.expression)?;
    info!(job_id = submitted.id, status = ?submitted.status, "accepted expression");
    Ok((StatusCode::CREATED, Json(submitted)))
}

/// `GET /api/v1/expressions`
pub async fn list_expressions(State(state): State<Arc<AppState>>) -> ApiResult<Json<JobList>> {
    let expressions = state.scheduler.jobs()?;
    Ok(Json(JobList { expressions }))
}

/// `GET /api/v1/expressions/{id}`
pub async fn get_expression(
    State(state): State<Arc<AppState>>,
    Path(id): Path<JobId>,
) -> ApiResult<Json<JobEnvelope>> {
    let expression = state.scheduler.job(id)?;
    Ok(Json(JobEnvelope { expression }))
}
