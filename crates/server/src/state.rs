use std::sync::Arc;

use chrono::{DateTime, Utc};

use exprflow_scheduler::Scheduler;

/// Shared handler state.
pub struct AppState {
    pub scheduler: Arc<Scheduler>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        Self {
            scheduler,
            started_at: Utc::now(),
        }
    }
}
