//! Orchestrator HTTP service: accepts expressions from users and hands
//! operator tasks to compute agents.

pub mod api;
pub mod error;
pub mod reaper;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
