use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use tracing::info;

use exprflow_core::{JobId, JobSnapshot, JobStatus, SubmittedJob};

use crate::error::SchedulerError;
use crate::metrics::SchedulerMetrics;
use crate::model::Job;
use crate::parser;
use crate::store::{MemoryTaskStore, TaskStore};
use crate::types::SchedulerConfig;

/// Everything guarded by the scheduler lock.
pub(super) struct SchedulerState<S> {
    pub(super) jobs: BTreeMap<JobId, Job>,
    pub(super) store: S,
    pub(super) next_job_id: JobId,
    pub(super) metrics: SchedulerMetrics,
}

/// The expression scheduler.
///
/// A single instance is authoritative for its jobs and tasks. All operations
/// take one short critical section and never block on I/O while holding it,
/// so the scheduler can be shared behind an `Arc` by HTTP handlers and
/// background loops alike.
pub struct Scheduler<S: TaskStore = MemoryTaskStore> {
    pub(super) config: SchedulerConfig,
    pub(super) state: Mutex<SchedulerState<S>>,
}

impl Scheduler {
    /// Create a scheduler backed by an in-memory task store.
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_store(config, MemoryTaskStore::new())
    }
}

impl<S: TaskStore> Scheduler<S> {
    pub fn with_store(config: SchedulerConfig, store: S) -> Self {
        Self {
            config,
            state: Mutex::new(SchedulerState {
                jobs: BTreeMap::new(),
                store,
                next_job_id: 1,
                metrics: SchedulerMetrics::default(),
            }),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub(super) fn lock(&self) -> Result<MutexGuard<'_, SchedulerState<S>>, SchedulerError> {
        self.state
            .lock()
            .map_err(|e| SchedulerError::LockPoisoned(format!("scheduler state: {}", e)))
    }

    /// Parse `expression`, register a job and emit its initially ready tasks.
    ///
    /// A syntax error creates nothing. An expression without operators is
    /// finished on the spot.
    pub fn submit(&self, expression: &str) -> Result<SubmittedJob, SchedulerError> {
        let ast = parser::parse(expression)?;

        let mut guard = self.lock()?;
        let state = &mut *guard;
        let id = state.next_job_id;
        state.next_job_id += 1;
        state.metrics.jobs_submitted += 1;

        let mut job = Job::new(id, expression.trim(), ast);
        let root = job.ast.root();
        if let Some(value) = job.ast.node(root).value {
            job.finish(JobStatus::Done, Some(value));
            state.metrics.jobs_done += 1;
            info!(job_id = id, result = value, "literal expression finished immediately");
        } else {
            let emitted = self.emit_ready_tasks(&mut job, root, &mut state.store, &mut state.metrics);
            info!(
                job_id = id,
                operators = job.ast.operator_count(),
                initial_tasks = emitted.len(),
                "expression submitted"
            );
        }

        let submitted = SubmittedJob {
            id,
            expression: job.expression.clone(),
            status: job.status,
        };
        state.jobs.insert(id, job);
        Ok(submitted)
    }

    pub fn job(&self, id: JobId) -> Result<JobSnapshot, SchedulerError> {
        let state = self.lock()?;
        state
            .jobs
            .get(&id)
            .map(Job::snapshot)
            .ok_or(SchedulerError::JobNotFound(id))
    }

    /// All jobs, ordered by id.
    pub fn jobs(&self) -> Result<Vec<JobSnapshot>, SchedulerError> {
        let state = self.lock()?;
        Ok(state.jobs.values().map(Job::snapshot).collect())
    }

    /// Whether `job_id` still has tasks pending or in progress.
    pub fn has_pending(&self, job_id: JobId) -> Result<bool, SchedulerError> {
        let state = self.lock()?;
        if !state.jobs.contains_key(&job_id) {
            return Err(SchedulerError::JobNotFound(job_id));
        }
        Ok(state.store.has_pending_tasks(job_id))
    }

    /// Snapshot of the scheduler counters.
    pub fn metrics(&self) -> Result<SchedulerMetrics, SchedulerError> {
        let state = self.lock()?;
        let mut metrics = state.metrics.clone();
        metrics.tasks = state.store.counts();
        Ok(metrics)
    }
}
