use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::store::TaskCounts;

/// Scheduler counters exposed on the stats endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerMetrics {
    pub jobs_submitted: u64,
    pub jobs_done: u64,
    pub jobs_failed: u64,
    pub tasks_emitted: u64,
    pub tasks_completed: u64,
    pub task_failures: u64,
    pub leases_reclaimed: u64,
    /// Current task table, filled in when a snapshot is taken.
    pub tasks: TaskCounts,
    /// Mean time between lease and completion.
    pub avg_task_duration: Duration,
    pub last_completion: Option<DateTime<Utc>>,
}

impl SchedulerMetrics {
    /// Record a completed task that was held for `held`.
    pub fn record_completion(&mut self, held: Duration) {
        self.tasks_completed += 1;
        self.last_completion = Some(Utc::now());

        // Incremental mean: new_avg = prev_avg + (held - prev_avg) / count
        let count = self.tasks_completed;
        self.avg_task_duration = if count == 1 {
            held
        } else {
            let prev = self.avg_task_duration.as_nanos() as f64;
            let cur = held.as_nanos() as f64;
            Duration::from_nanos((prev + (cur - prev) / count as f64) as u64)
        };
    }
}
