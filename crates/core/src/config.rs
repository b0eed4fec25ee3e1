use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::operator::Operator;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Like `profiled_env_u64`, but zero also falls back to `default`.
fn profiled_env_nonzero_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_parsed(profile, key)
        .filter(|n: &u64| *n > 0)
        .unwrap_or(default)
}

/// Unset or unparsable means "not configured".
fn profiled_env_parsed<T: std::str::FromStr>(profile: &str, key: &str) -> Option<T> {
    profiled_env_opt(profile, key).and_then(|v| v.parse().ok())
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub operation_times: OperationTimes,
    pub scheduler: SchedulerSettings,
    pub agent: AgentConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `EXPRFLOW_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("EXPRFLOW_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            operation_times: OperationTimes::from_env_profiled(p),
            scheduler: SchedulerSettings::from_env_profiled(p),
            agent: AgentConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:      {}:{}", self.server.host, self.server.port);
        tracing::info!(
            "  op times:    +={}ms -={}ms *={}ms /={}ms",
            self.operation_times.addition_ms,
            self.operation_times.subtraction_ms,
            self.operation_times.multiplication_ms,
            self.operation_times.division_ms
        );
        tracing::info!(
            "  scheduler:   max_retries={}, lease_ttl={}",
            self.scheduler
                .max_task_retries
                .map(|n| n.to_string())
                .unwrap_or_else(|| "unbounded".into()),
            self.scheduler
                .lease_ttl_ms
                .map(|ms| format!("{ms}ms"))
                .unwrap_or_else(|| "none".into())
        );
        tracing::info!(
            "  agent:       computing_power={}, orchestrator={}",
            self.agent.computing_power,
            self.agent.orchestrator_url
        );
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_u16(p, "PORT", 8080),
            cors_origin: profiled_env_or(p, "CORS_ORIGIN", "*"),
        }
    }
}

// ── Simulated operation durations ─────────────────────────────

const DEFAULT_OPERATION_MS: u64 = 1000;

/// Simulated execution time per operator, handed to agents with every task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationTimes {
    pub addition_ms: u64,
    pub subtraction_ms: u64,
    pub multiplication_ms: u64,
    pub division_ms: u64,
}

impl Default for OperationTimes {
    fn default() -> Self {
        Self::uniform(DEFAULT_OPERATION_MS)
    }
}

impl OperationTimes {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            addition_ms: profiled_env_u64(p, "TIME_ADDITION_MS", DEFAULT_OPERATION_MS),
            subtraction_ms: profiled_env_u64(p, "TIME_SUBTRACTION_MS", DEFAULT_OPERATION_MS),
            multiplication_ms: profiled_env_u64(p, "TIME_MULTIPLICATIONS_MS", DEFAULT_OPERATION_MS),
            division_ms: profiled_env_u64(p, "TIME_DIVISIONS_MS", DEFAULT_OPERATION_MS),
        }
    }

    /// Same duration for every operator (handy for tests).
    pub fn uniform(ms: u64) -> Self {
        Self {
            addition_ms: ms,
            subtraction_ms: ms,
            multiplication_ms: ms,
            division_ms: ms,
        }
    }

    /// Configured duration for `op`, in milliseconds.
    pub fn duration_ms(&self, op: Operator) -> u64 {
        match op {
            Operator::Add => self.addition_ms,
            Operator::Sub => self.subtraction_ms,
            Operator::Mul => self.multiplication_ms,
            Operator::Div => self.division_ms,
        }
    }
}

// ── Scheduler policy ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Retry ceiling per task. `None` retries forever.
    pub max_task_retries: Option<u32>,
    /// Lease time-to-live. `None` means leases never expire.
    pub lease_ttl_ms: Option<u64>,
    /// How often the server looks for expired leases. Never zero.
    pub lease_reap_interval_ms: u64,
}

impl SchedulerSettings {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            max_task_retries: profiled_env_parsed(p, "MAX_TASK_RETRIES"),
            lease_ttl_ms: profiled_env_parsed(p, "LEASE_TTL_MS"),
            lease_reap_interval_ms: profiled_env_nonzero_u64(p, "LEASE_REAP_INTERVAL_MS", 1000),
        }
    }

    pub fn lease_ttl(&self) -> Option<Duration> {
        self.lease_ttl_ms.map(Duration::from_millis)
    }
}

// ── Agent ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Number of concurrent workers per agent process.
    pub computing_power: usize,
    pub orchestrator_url: String,
    /// Wait between polls when no task is available, and between transport
    /// retries. Never zero.
    pub poll_interval_ms: u64,
}

impl AgentConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            computing_power: profiled_env_parsed(p, "COMPUTING_POWER")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(1),
            orchestrator_url: profiled_env_or(p, "ORCHESTRATOR_URL", "http://localhost:8080"),
            poll_interval_ms: profiled_env_nonzero_u64(p, "AGENT_POLL_INTERVAL_MS", 1000),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
