use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use exprflow_core::{JobStatus, TaskId, TaskStatus};

use super::core::{Scheduler, SchedulerState};
use crate::error::SchedulerError;
use crate::model::Task;
use crate::store::TaskStore;

impl<S: TaskStore> Scheduler<S> {
    /// Lease the oldest pending task to `agent_id`. `Ok(None)` when idle.
    pub fn lease_pending(&self, agent_id: &str) -> Result<Option<Task>, SchedulerError> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let Some(task) = state.store.lease_pending(agent_id) else {
            return Ok(None);
        };
        if let Some(job) = state.jobs.get_mut(&task.job_id) {
            if job.status == JobStatus::Pending {
                job.status = JobStatus::InProgress;
            }
        }
        debug!(task_id = task.id, job_id = task.job_id, agent = %agent_id, "task leased");
        Ok(Some(task))
    }

    /// Accept `result` for a leased task and propagate it through the job.
    pub fn complete(&self, task_id: TaskId, result: f64) -> Result<Task, SchedulerError> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let task = state.store.complete(task_id, result)?;

        let held = task
            .leased_at
            .and_then(|at| (Utc::now() - at).to_std().ok())
            .unwrap_or_default();
        state.metrics.record_completion(held);

        match state.jobs.get_mut(&task.job_id) {
            Some(job) if job.status.is_terminal() => {
                warn!(task_id, job_id = job.id, status = ?job.status, "result for finished job ignored");
            }
            Some(job) => {
                self.on_result(job, &task, result, &mut state.store, &mut state.metrics);
            }
            None => warn!(task_id, job_id = task.job_id, "completed task has no job"),
        }
        debug!(task_id, job_id = task.job_id, result, "task completed");
        Ok(task)
    }

    /// Give a leased task back. It returns to the queue with one more retry,
    /// unless that would exceed the configured ceiling, in which case the
    /// whole job fails.
    pub fn fail(&self, task_id: TaskId) -> Result<Task, SchedulerError> {
        let mut guard = self.lock()?;
        self.fail_locked(&mut guard, task_id)
    }

    fn fail_locked(
        &self,
        state: &mut SchedulerState<S>,
        task_id: TaskId,
    ) -> Result<Task, SchedulerError> {
        let task = state
            .store
            .get_task(task_id)
            .ok_or(SchedulerError::TaskNotFound(task_id))?;
        if task.status != TaskStatus::InProgress {
            return Err(SchedulerError::StateConflict { task_id, status: task.status });
        }
        state.metrics.task_failures += 1;

        if let Some(max_retries) = self.config.max_retries {
            if task.retries >= max_retries {
                let discarded = state.store.discard_job(task.job_id);
                if let Some(job) = state.jobs.get_mut(&task.job_id) {
                    job.finish(JobStatus::Failed, None);
                }
                state.metrics.jobs_failed += 1;
                warn!(
                    task_id,
                    job_id = task.job_id,
                    max_retries,
                    discarded,
                    "retry limit exceeded, job failed"
                );
                return Err(SchedulerError::RetryLimitExceeded {
                    task_id,
                    job_id: task.job_id,
                    max_retries,
                });
            }
        }

        let requeued = state.store.fail(task_id)?;
        warn!(task_id, job_id = requeued.job_id, retries = requeued.retries, "task failed, requeued");
        Ok(requeued)
    }

    pub fn get_task(&self, task_id: TaskId) -> Result<Task, SchedulerError> {
        let state = self.lock()?;
        state
            .store
            .get_task(task_id)
            .ok_or(SchedulerError::TaskNotFound(task_id))
    }

    /// Fail every lease older than the configured TTL. Each reclaim counts as
    /// a retry. Does nothing without a TTL.
    ///
    /// A reclaim that exhausts the retry ceiling fails its job and discards
    /// the job's other tasks; expired leases among those are skipped.
    pub fn reclaim_expired_leases(&self, now: DateTime<Utc>) -> Result<Vec<TaskId>, SchedulerError> {
        let Some(ttl) = self.config.lease_ttl else {
            return Ok(Vec::new());
        };
        let mut guard = self.lock()?;
        let state = &mut *guard;

        let expired = state.store.expired_leases(now, ttl);
        let mut reclaimed = Vec::with_capacity(expired.len());
        for task_id in expired {
            match self.fail_locked(state, task_id) {
                Ok(_) => reclaimed.push(task_id),
                Err(SchedulerError::RetryLimitExceeded { .. }) => reclaimed.push(task_id),
                Err(SchedulerError::TaskNotFound(_)) => {
                    debug!(task_id, "expired lease discarded with its job");
                }
                Err(e) => return Err(e),
            }
        }
        if !reclaimed.is_empty() {
            state.metrics.leases_reclaimed += reclaimed.len() as u64;
            info!(count = reclaimed.len(), "reclaimed expired leases");
        }
        Ok(reclaimed)
    }
}
