//! Transport between agent and orchestrator.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use exprflow_core::{ResultSubmission, TaskEnvelope, TaskId, TaskInfo};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("task {0} not found")]
    TaskNotFound(TaskId),
    #[error("task {id} rejected: {reason}")]
    Rejected { id: TaskId, reason: String },
    #[error("API error: {status} - {body}")]
    Api { status: u16, body: String },
}

impl ClientError {
    /// The orchestrator has answered for good; retrying cannot succeed.
    pub fn is_definitive(&self) -> bool {
        matches!(self, ClientError::TaskNotFound(_) | ClientError::Rejected { .. })
    }
}

/// How an agent talks to the scheduler.
#[async_trait]
pub trait SchedulerClient: Send + Sync {
    /// Lease the next task. `Ok(None)` when none is ready.
    async fn fetch_task(&self, agent_id: &str) -> Result<Option<TaskInfo>, ClientError>;

    /// Report the result of a leased task.
    async fn submit_result(&self, submission: ResultSubmission) -> Result<(), ClientError>;
}

/// [`SchedulerClient`] over the orchestrator's internal HTTP API.
#[derive(Debug, Clone)]
pub struct HttpSchedulerClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSchedulerClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn task_url(&self) -> String {
        format!("{}/internal/task", self.base_url)
    }
}

async fn api_error(response: reqwest::Response) -> ClientError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    ClientError::Api { status, body }
}

#[async_trait]
impl SchedulerClient for HttpSchedulerClient {
    async fn fetch_task(&self, agent_id: &str) -> Result<Option<TaskInfo>, ClientError> {
        let response = self
            .client
            .get(self.task_url())
            .query(&[("agent_id", agent_id)])
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let envelope: TaskEnvelope = response.json().await?;
                debug!(task_id = envelope.task.id, agent = %agent_id, "fetched task");
                Ok(Some(envelope.task))
            }
            _ => Err(api_error(response).await),
        }
    }

    async fn submit_result(&self, submission: ResultSubmission) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.task_url())
            .json(&submission)
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(ClientError::TaskNotFound(submission.id)),
            StatusCode::CONFLICT => {
                let reason = response.text().await.unwrap_or_default();
                Err(ClientError::Rejected { id: submission.id, reason })
            }
            _ => Err(api_error(response).await),
        }
    }
}
