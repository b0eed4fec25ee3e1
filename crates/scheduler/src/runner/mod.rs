//! Scheduler runner -- owns jobs and the task store behind one lock.
//!
//! Split into focused submodules:
//! - `core`: Scheduler struct, constructor, submission and read accessors
//! - `emission`: readiness-driven task creation and result propagation
//! - `lifecycle`: lease, complete, fail and lease reclamation

mod core;
mod emission;
mod lifecycle;
#[cfg(test)]
mod tests;

pub use self::core::Scheduler;
