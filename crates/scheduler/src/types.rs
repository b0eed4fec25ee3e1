use std::time::Duration;

use serde::{Deserialize, Serialize};

use exprflow_core::config::{Config, OperationTimes};

/// Scheduler policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Simulated duration handed out with each task, per operator.
    #[serde(default)]
    pub operation_times: OperationTimes,
    /// Failures a task may accumulate before its job fails. `None` = unbounded.
    #[serde(default)]
    pub max_retries: Option<u32>,
    /// How long an agent may hold a lease. `None` = forever.
    #[serde(default)]
    pub lease_ttl: Option<Duration>,
}

impl SchedulerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            operation_times: config.operation_times,
            max_retries: config.scheduler.max_task_retries,
            lease_ttl: config.scheduler.lease_ttl(),
        }
    }

    pub fn with_operation_times(mut self, times: OperationTimes) -> Self {
        self.operation_times = times;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_lease_ttl(mut self, ttl: Duration) -> Self {
        self.lease_ttl = Some(ttl);
        self
    }
}
