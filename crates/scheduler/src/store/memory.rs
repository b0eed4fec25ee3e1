use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use exprflow_core::{JobId, TaskId, TaskStatus};

use super::{StoreError, TaskCounts, TaskStore};
use crate::model::{NewTask, Task};

/// In-memory [`TaskStore`]: a task table, a FIFO of pending ids and the set
/// of leased ids.
#[derive(Debug)]
pub struct MemoryTaskStore {
    tasks: HashMap<TaskId, Task>,
    queue: VecDeque<TaskId>,
    in_progress: HashSet<TaskId>,
    next_id: TaskId,
}

impl Default for MemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            queue: VecDeque::new(),
            in_progress: HashSet::new(),
            next_id: 1,
        }
    }

    /// Pending task ids in queue order.
    #[cfg(test)]
    pub(crate) fn queued(&self) -> Vec<TaskId> {
        self.queue.iter().copied().collect()
    }

    fn leased_mut(&mut self, id: TaskId) -> Result<&mut Task, StoreError> {
        let task = self.tasks.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if task.status != TaskStatus::InProgress {
            return Err(StoreError::StateConflict { id, status: task.status });
        }
        Ok(task)
    }
}

impl TaskStore for MemoryTaskStore {
    fn create_task(&mut self, new: NewTask) -> TaskId {
        let id = self.next_id;
        self.next_id += 1;
        self.tasks.insert(id, Task::from_new(id, new));
        self.queue.push_back(id);
        id
    }

    fn lease_pending(&mut self, agent_id: &str) -> Option<Task> {
        let id = self.queue.pop_front()?;
        let task = self.tasks.get_mut(&id)?;
        task.status = TaskStatus::InProgress;
        task.leased_by = Some(agent_id.to_string());
        task.leased_at = Some(Utc::now());
        self.in_progress.insert(id);
        Some(task.clone())
    }

    fn complete(&mut self, id: TaskId, result: f64) -> Result<Task, StoreError> {
        let task = self.leased_mut(id)?;
        task.status = TaskStatus::Done;
        task.result = Some(result);
        let done = task.clone();
        self.in_progress.remove(&id);
        Ok(done)
    }

    fn fail(&mut self, id: TaskId) -> Result<Task, StoreError> {
        let task = self.leased_mut(id)?;
        task.status = TaskStatus::Pending;
        task.retries += 1;
        task.leased_by = None;
        task.leased_at = None;
        let requeued = task.clone();
        self.in_progress.remove(&id);
        self.queue.push_back(id);
        Ok(requeued)
    }

    fn get_task(&self, id: TaskId) -> Option<Task> {
        self.tasks.get(&id).cloned()
    }

    fn has_pending_tasks(&self, job_id: JobId) -> bool {
        self.queue
            .iter()
            .chain(self.in_progress.iter())
            .filter_map(|id| self.tasks.get(id))
            .any(|t| t.job_id == job_id)
    }

    fn expired_leases(&self, now: DateTime<Utc>, ttl: Duration) -> Vec<TaskId> {
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return Vec::new();
        };
        let cutoff = now - ttl;
        let mut expired: Vec<(DateTime<Utc>, TaskId)> = self
            .in_progress
            .iter()
            .filter_map(|id| self.tasks.get(id))
            .filter_map(|t| t.leased_at.filter(|at| *at < cutoff).map(|at| (at, t.id)))
            .collect();
        expired.sort();
        expired.into_iter().map(|(_, id)| id).collect()
    }

    fn discard_job(&mut self, job_id: JobId) -> usize {
        let doomed: Vec<TaskId> = self
            .tasks
            .values()
            .filter(|t| t.job_id == job_id && t.status != TaskStatus::Done)
            .map(|t| t.id)
            .collect();
        for id in &doomed {
            self.tasks.remove(id);
            self.in_progress.remove(id);
        }
        self.queue.retain(|id| !doomed.contains(id));
        debug!(job_id, discarded = doomed.len(), "discarded unfinished tasks");
        doomed.len()
    }

    fn counts(&self) -> TaskCounts {
        TaskCounts {
            pending: self.queue.len(),
            in_progress: self.in_progress.len(),
            done: self.tasks.len() - self.queue.len() - self.in_progress.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use exprflow_core::Operator;

    use super::*;

    fn new_task(job_id: JobId, node: usize) -> NewTask {
        NewTask {
            job_id,
            node,
            operator: Operator::Add,
            arg1: 1.0,
            arg2: 2.0,
            operation_time_ms: 0,
            is_final: false,
        }
    }

    #[test]
    fn ids_start_at_one_and_increase() {
        let mut store = MemoryTaskStore::new();
        assert_eq!(store.create_task(new_task(1, 0)), 1);
        assert_eq!(store.create_task(new_task(1, 1)), 2);
        assert_eq!(store.queued(), vec![1, 2]);
    }

    #[test]
    fn lease_is_fifo_and_records_holder() {
        let mut store = MemoryTaskStore::new();
        store.create_task(new_task(1, 0));
        store.create_task(new_task(1, 1));

        let first = store.lease_pending("agent-a").unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(first.status, TaskStatus::InProgress);
        assert_eq!(first.leased_by.as_deref(), Some("agent-a"));
        assert!(first.leased_at.is_some());

        assert_eq!(store.lease_pending("agent-b").unwrap().id, 2);
        assert!(store.lease_pending("agent-c").is_none());
    }

    #[test]
    fn complete_requires_lease() {
        let mut store = MemoryTaskStore::new();
        let id = store.create_task(new_task(1, 0));

        assert_eq!(
            store.complete(id, 3.0),
            Err(StoreError::StateConflict { id, status: TaskStatus::Pending })
        );
        assert_eq!(store.complete(99, 3.0), Err(StoreError::NotFound(99)));

        store.lease_pending("a");
        let done = store.complete(id, 3.0).unwrap();
        assert_eq!(done.status, TaskStatus::Done);
        assert_eq!(done.result, Some(3.0));

        assert_eq!(
            store.complete(id, 3.0),
            Err(StoreError::StateConflict { id, status: TaskStatus::Done })
        );
    }

    #[test]
    fn fail_requeues_at_tail_with_retry() {
        let mut store = MemoryTaskStore::new();
        let a = store.create_task(new_task(1, 0));
        let b = store.create_task(new_task(1, 1));

        store.lease_pending("x");
        let failed = store.fail(a).unwrap();
        assert_eq!(failed.status, TaskStatus::Pending);
        assert_eq!(failed.retries, 1);
        assert_eq!(failed.leased_by, None);
        assert_eq!(store.queued(), vec![b, a]);

        assert_eq!(
            store.fail(a),
            Err(StoreError::StateConflict { id: a, status: TaskStatus::Pending })
        );
    }

    #[test]
    fn pending_tracking_per_job() {
        let mut store = MemoryTaskStore::new();
        let id = store.create_task(new_task(7, 0));
        assert!(store.has_pending_tasks(7));
        assert!(!store.has_pending_tasks(8));

        store.lease_pending("a");
        assert!(store.has_pending_tasks(7));
        store.complete(id, 1.0).unwrap();
        assert!(!store.has_pending_tasks(7));
    }

    #[test]
    fn expired_leases_respect_ttl() {
        let mut store = MemoryTaskStore::new();
        let id = store.create_task(new_task(1, 0));
        store.create_task(new_task(1, 1));
        store.lease_pending("a");

        let ttl = Duration::from_secs(30);
        assert!(store.expired_leases(Utc::now(), ttl).is_empty());

        let later = Utc::now() + chrono::Duration::seconds(60);
        assert_eq!(store.expired_leases(later, ttl), vec![id]);
    }

    #[test]
    fn discard_drops_unfinished_tasks_only() {
        let mut store = MemoryTaskStore::new();
        let done = store.create_task(new_task(1, 0));
        store.lease_pending("a");
        store.complete(done, 1.0).unwrap();
        store.create_task(new_task(1, 1));
        store.create_task(new_task(1, 2));
        store.lease_pending("a");
        let other = store.create_task(new_task(2, 0));

        assert_eq!(store.discard_job(1), 2);
        assert_eq!(store.queued(), vec![other]);
        assert!(store.get_task(done).is_some());
        assert_eq!(
            store.counts(),
            TaskCounts { pending: 1, in_progress: 0, done: 1 }
        );
    }
}
