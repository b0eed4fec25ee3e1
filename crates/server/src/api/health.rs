use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use exprflow_scheduler::SchedulerMetrics;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub started_at: DateTime<Utc>,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        started_at: state.started_at,
    })
}

/// `GET /api/v1/stats`
pub async fn stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<SchedulerMetrics>> {
    Ok(Json(state.scheduler.metrics()?))
}
