use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use exprflow_core::{
    ComputeError, JobId, JobSnapshot, JobStatus, Operator, TaskId, TaskInfo, TaskStatus,
};

/// Index of a node inside its [`Ast`] arena.
pub type NodeId = usize;

/// One entry of the expression tree.
///
/// A leaf carries a value and no children. An operator node has exactly two
/// children until it resolves; from then on it carries a value as well and is
/// treated as a leaf by scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub op: Option<Operator>,
    pub value: Option<f64>,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
    pub parent: Option<NodeId>,
    /// Set once a task has been emitted for this node.
    pub scheduled: bool,
}

impl Node {
    pub fn leaf(value: f64) -> Self {
        Self {
            op: None,
            value: Some(value),
            left: None,
            right: None,
            parent: None,
            scheduled: false,
        }
    }

    pub fn binary(op: Operator, left: NodeId, right: NodeId) -> Self {
        Self {
            op: Some(op),
            value: None,
            left: Some(left),
            right: Some(right),
            parent: None,
            scheduled: false,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.value.is_some()
    }
}

/// Parsed expression: a node arena plus its root.
///
/// Children are always stored before their parent, so walking the arena in
/// index order visits every subtree in post-order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ast {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
}

impl Ast {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of operator nodes, i.e. tasks needed to resolve the tree.
    pub fn operator_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.op.is_some()).count()
    }

    /// Operands of `id` when it is an unscheduled, unresolved operator whose
    /// children both carry values.
    pub fn ready_operands(&self, id: NodeId) -> Option<(Operator, f64, f64)> {
        let node = self.node(id);
        if node.scheduled || node.is_resolved() {
            return None;
        }
        let op = node.op?;
        let left = self.node(node.left?).value?;
        let right = self.node(node.right?).value?;
        Some((op, left, right))
    }

    /// Evaluate the whole tree locally.
    pub fn evaluate(&self) -> Result<f64, ComputeError> {
        let mut values: Vec<f64> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let value = match (node.value, node.op, node.left, node.right) {
                (Some(v), _, _, _) => v,
                (None, Some(op), Some(l), Some(r)) => op.apply(values[l], values[r])?,
                _ => return Err(ComputeError::UnknownOperator("<missing>".into())),
            };
            values.push(value);
        }
        Ok(values[self.root])
    }
}

/// A submitted expression and its evaluation progress.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub expression: String,
    pub status: JobStatus,
    pub result: Option<f64>,
    pub ast: Ast,
    /// "arg1 op arg2 = result" lines in completion order.
    pub steps: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(id: JobId, expression: impl Into<String>, ast: Ast) -> Self {
        Self {
            id,
            expression: expression.into(),
            status: JobStatus::Pending,
            result: None,
            ast,
            steps: Vec::new(),
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub(crate) fn finish(&mut self, status: JobStatus, result: Option<f64>) {
        self.status = status;
        self.result = result;
        self.finished_at = Some(Utc::now());
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            expression: self.expression.clone(),
            status: self.status,
            result: self.result,
            steps: self.steps.clone(),
            created_at: self.created_at,
            finished_at: self.finished_at,
        }
    }
}

/// Everything needed to create a task; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub job_id: JobId,
    pub node: NodeId,
    pub operator: Operator,
    pub arg1: f64,
    pub arg2: f64,
    pub operation_time_ms: u64,
    pub is_final: bool,
}

/// A single binary operation bound to one tree node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: TaskId,
    pub job_id: JobId,
    pub node: NodeId,
    pub operator: Operator,
    pub arg1: f64,
    pub arg2: f64,
    pub operation_time_ms: u64,
    pub is_final: bool,
    pub status: TaskStatus,
    pub retries: u32,
    pub result: Option<f64>,
    /// Agent currently holding the lease.
    pub leased_by: Option<String>,
    pub leased_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn from_new(id: TaskId, new: NewTask) -> Self {
        Self {
            id,
            job_id: new.job_id,
            node: new.node,
            operator: new.operator,
            arg1: new.arg1,
            arg2: new.arg2,
            operation_time_ms: new.operation_time_ms,
            is_final: new.is_final,
            status: TaskStatus::Pending,
            retries: 0,
            result: None,
            leased_by: None,
            leased_at: None,
            created_at: Utc::now(),
        }
    }

    /// Agent-facing view of the task.
    pub fn info(&self) -> TaskInfo {
        TaskInfo {
            id: self.id,
            expression_job_id: self.job_id,
            arg1: self.arg1,
            arg2: self.arg2,
            operation: self.operator.to_string(),
            operation_time: self.operation_time_ms,
            is_final: self.is_final,
        }
    }

    /// Step log line for a completed task.
    pub fn step(&self, result: f64) -> String {
        format!("{:.2} {} {:.2} = {:.2}", self.arg1, self.operator, self.arg2, result)
    }
}
