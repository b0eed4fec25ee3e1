//! Compute agent: leases operator tasks from the orchestrator, evaluates
//! them and reports results back.

pub mod client;
pub mod compute;
pub mod worker;

pub use client::{ClientError, HttpSchedulerClient, SchedulerClient};
pub use worker::{Agent, AgentSettings};
