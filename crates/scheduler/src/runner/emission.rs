use tracing::{debug, info};

use exprflow_core::{JobStatus, TaskId};

use super::core::Scheduler;
use crate::metrics::SchedulerMetrics;
use crate::model::{Job, NewTask, NodeId, Task};
use crate::store::TaskStore;

impl<S: TaskStore> Scheduler<S> {
    /// Emit a task for every ready operator node under `start`, visiting the
    /// subtree in post-order, left before right. Already scheduled nodes are
    /// skipped, so repeated calls are harmless.
    pub(super) fn emit_ready_tasks(
        &self,
        job: &mut Job,
        start: NodeId,
        store: &mut S,
        metrics: &mut SchedulerMetrics,
    ) -> Vec<TaskId> {
        let mut order = Vec::new();
        let mut stack = vec![(start, false)];
        while let Some((id, expanded)) = stack.pop() {
            let node = job.ast.node(id);
            if node.is_resolved() {
                continue;
            }
            if expanded {
                order.push(id);
                continue;
            }
            stack.push((id, true));
            if let Some(right) = node.right {
                stack.push((right, false));
            }
            if let Some(left) = node.left {
                stack.push((left, false));
            }
        }

        order
            .into_iter()
            .filter_map(|id| self.plan_node(job, id, store, metrics))
            .collect()
    }

    /// Create the task for `node` if both operands are known.
    fn plan_node(
        &self,
        job: &mut Job,
        node: NodeId,
        store: &mut S,
        metrics: &mut SchedulerMetrics,
    ) -> Option<TaskId> {
        let (operator, arg1, arg2) = job.ast.ready_operands(node)?;
        let task_id = store.create_task(NewTask {
            job_id: job.id,
            node,
            operator,
            arg1,
            arg2,
            operation_time_ms: self.config.operation_times.duration_ms(operator),
            is_final: node == job.ast.root(),
        });
        job.ast.node_mut(node).scheduled = true;
        metrics.tasks_emitted += 1;
        debug!(job_id = job.id, task_id, node, op = %operator, arg1, arg2, "task emitted");
        Some(task_id)
    }

    /// Fold a completed task's value into its job.
    ///
    /// Resolving the root finishes the job. Otherwise only the ancestor chain
    /// is examined: the first unresolved ancestor gets a task if its other
    /// operand is already known, and the walk stops there.
    pub(super) fn on_result(
        &self,
        job: &mut Job,
        task: &Task,
        value: f64,
        store: &mut S,
        metrics: &mut SchedulerMetrics,
    ) {
        let node = job.ast.node_mut(task.node);
        node.value = Some(value);
        let parent = node.parent;
        job.steps.push(task.step(value));

        if task.node == job.ast.root() {
            job.finish(JobStatus::Done, Some(value));
            metrics.jobs_done += 1;
            info!(job_id = job.id, result = value, steps = job.steps.len(), "job finished");
            return;
        }

        let mut cursor = parent;
        while let Some(ancestor) = cursor {
            let node = job.ast.node(ancestor);
            if node.is_resolved() {
                cursor = node.parent;
                continue;
            }
            if self.plan_node(job, ancestor, store, metrics).is_none() {
                debug!(job_id = job.id, node = ancestor, "waiting for sibling operand");
            }
            break;
        }
    }
}
