//! HTTP handlers, grouped by audience.
//!
//! - `expressions`: the public API for submitting and inspecting jobs
//! - `tasks`: the internal API polled by compute agents
//! - `health`: liveness and scheduler counters

mod expressions;
mod health;
mod tasks;

pub use expressions::{calculate, get_expression, list_expressions};
pub use health::{health, stats};
pub use tasks::{fail_task, fetch_task, submit_result, FetchTaskParams};
