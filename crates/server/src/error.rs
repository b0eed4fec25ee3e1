use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{debug, error};

use exprflow_core::ErrorBody;
use exprflow_scheduler::SchedulerError;

/// Handler error rendered as `{"error": "..."}` with a matching status.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }
}

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        let status = match &err {
            SchedulerError::Syntax(e) => {
                debug!(offset = e.offset(), error = %e, "rejected expression");
                StatusCode::UNPROCESSABLE_ENTITY
            }
            SchedulerError::JobNotFound(_) | SchedulerError::TaskNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            SchedulerError::StateConflict { .. } => StatusCode::CONFLICT,
            SchedulerError::RetryLimitExceeded { .. } => StatusCode::GONE,
            SchedulerError::LockPoisoned(_) => {
                error!(error = %err, "scheduler unavailable");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody::new(self.message))).into_response()
    }
}
