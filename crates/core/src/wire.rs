//! JSON bodies exchanged between the orchestrator and its clients.
//!
//! The server produces these, the agent and API consumers read them. Field
//! names are part of the public protocol; keep them stable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{JobId, TaskId};

/// Lifecycle of a submitted expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Done,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

/// Lifecycle of one binary-operation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Done,
}

// ── Public API ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitExpressionRequest {
    pub expression: String,
}

/// Response to a successful submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedJob {
    pub id: JobId,
    pub expression: String,
    pub status: JobStatus,
}

/// Point-in-time view of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub expression: String,
    pub status: JobStatus,
    pub result: Option<f64>,
    pub steps: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobList {
    pub expressions: Vec<JobSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEnvelope {
    pub expression: JobSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self { error: message.into() }
    }
}

// ── Internal (agent) API ──────────────────────────────────────

/// A leased task as handed to an agent.
///
/// `operation` travels as the operator symbol so that agents can reject
/// symbols they do not know without failing to decode the whole body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub id: TaskId,
    pub expression_job_id: JobId,
    pub arg1: f64,
    pub arg2: f64,
    pub operation: String,
    /// Simulated execution time in milliseconds.
    pub operation_time: u64,
    pub is_final: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub task: TaskInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResultSubmission {
    pub id: TaskId,
    pub result: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FailRequest {
    pub id: TaskId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_uses_snake_case() {
        assert_eq!(serde_json::to_value(JobStatus::InProgress).unwrap(), json!("in_progress"));
        assert_eq!(serde_json::to_value(TaskStatus::Done).unwrap(), json!("done"));
    }

    #[test]
    fn task_info_field_names() {
        let task = TaskInfo {
            id: 7,
            expression_job_id: 2,
            arg1: 3.0,
            arg2: 4.0,
            operation: "+".into(),
            operation_time: 50,
            is_final: false,
        };
        let value = serde_json::to_value(TaskEnvelope { task }).unwrap();
        assert_eq!(value["task"]["expression_job_id"], json!(2));
        assert_eq!(value["task"]["operation"], json!("+"));
        assert_eq!(value["task"]["operation_time"], json!(50));
        assert_eq!(value["task"]["is_final"], json!(false));
    }

    #[test]
    fn submission_requires_both_fields() {
        let parsed: Result<ResultSubmission, _> = serde_json::from_value(json!({ "id": 1 }));
        assert!(parsed.is_err());
        let parsed: ResultSubmission =
            serde_json::from_value(json!({ "id": 1, "result": 2.5 })).unwrap();
        assert_eq!(parsed, ResultSubmission { id: 1, result: 2.5 });
    }

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Done.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::InProgress.is_terminal());
    }
}
