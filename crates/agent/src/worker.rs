//! Worker pool: `computing_power` independent loops sharing one client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use exprflow_core::config::AgentConfig;
use exprflow_core::{ResultSubmission, TaskInfo};

use crate::client::SchedulerClient;
use crate::compute;

#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Prefix for per-worker lease holder ids (`{name}-{index}`).
    pub name: String,
    pub computing_power: usize,
    /// Wait when idle and between transport retries.
    pub poll_interval: Duration,
}

impl AgentSettings {
    pub fn from_config(config: &AgentConfig, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            computing_power: config.computing_power.max(1),
            poll_interval: config.poll_interval(),
        }
    }
}

/// A pool of workers pulling tasks through a [`SchedulerClient`].
pub struct Agent {
    client: Arc<dyn SchedulerClient>,
    settings: AgentSettings,
    completed: Arc<AtomicU64>,
}

impl Agent {
    pub fn new(client: Arc<dyn SchedulerClient>, settings: AgentSettings) -> Self {
        Self {
            client,
            settings,
            completed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Results accepted by the orchestrator so far.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Run every worker until `shutdown` becomes `true`. A worker finishes
    /// its in-flight task before stopping.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        info!(
            agent = %self.settings.name,
            workers = self.settings.computing_power,
            "agent starting"
        );

        let mut workers = JoinSet::new();
        for index in 0..self.settings.computing_power {
            let worker = Worker {
                id: format!("{}-{}", self.settings.name, index),
                client: Arc::clone(&self.client),
                poll_interval: self.settings.poll_interval,
                completed: Arc::clone(&self.completed),
                shutdown: shutdown.clone(),
            };
            workers.spawn(worker.run());
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "worker panicked");
            }
        }
        info!(agent = %self.settings.name, completed = self.completed(), "agent stopped");
    }
}

struct Worker {
    id: String,
    client: Arc<dyn SchedulerClient>,
    poll_interval: Duration,
    completed: Arc<AtomicU64>,
    shutdown: watch::Receiver<bool>,
}

impl Worker {
    async fn run(mut self) {
        debug!(worker = %self.id, "worker started");
        while !self.stopping() {
            match self.client.fetch_task(&self.id).await {
                Ok(Some(task)) => self.process(task).await,
                Ok(None) => {
                    self.pause(self.poll_interval).await;
                }
                Err(e) => {
                    warn!(worker = %self.id, error = %e, "fetch failed, backing off");
                    self.pause(self.poll_interval).await;
                }
            }
        }
        debug!(worker = %self.id, "worker stopped");
    }

    async fn process(&mut self, task: TaskInfo) {
        let result = compute::evaluate_or_zero(&task);
        tokio::time::sleep(Duration::from_millis(task.operation_time)).await;

        let submission = ResultSubmission { id: task.id, result };
        loop {
            match self.client.submit_result(submission).await {
                Ok(()) => {
                    self.completed.fetch_add(1, Ordering::Relaxed);
                    info!(
                        worker = %self.id,
                        task_id = task.id,
                        job_id = task.expression_job_id,
                        "{} {} {} = {}",
                        task.arg1,
                        task.operation,
                        task.arg2,
                        result
                    );
                    return;
                }
                Err(e) if e.is_definitive() => {
                    warn!(worker = %self.id, task_id = task.id, error = %e, "result dropped");
                    return;
                }
                Err(e) => {
                    warn!(worker = %self.id, task_id = task.id, error = %e, "submit failed, retrying");
                    if !self.pause(self.poll_interval).await {
                        warn!(worker = %self.id, task_id = task.id, "shutting down with unsent result");
                        return;
                    }
                }
            }
        }
    }

    /// Shutdown requested, or the sender is gone.
    fn stopping(&self) -> bool {
        *self.shutdown.borrow() || self.shutdown.has_changed().is_err()
    }

    /// Sleep for `duration`. Returns `false` if shutdown was requested.
    async fn pause(&mut self, duration: Duration) -> bool {
        if self.stopping() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.shutdown.changed() => {}
        }
        !self.stopping()
    }
}
