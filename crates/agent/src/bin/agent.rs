//! exprflow-agent: compute agent.
//!
//! Polls the orchestrator for operator tasks with `COMPUTING_POWER`
//! concurrent workers and reports each result back.

use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use exprflow_agent::{Agent, AgentSettings, HttpSchedulerClient};
use exprflow_core::config::{self, Config};
use exprflow_core::signal::os_signal;

// ── CLI ─────────────────────────────────────────────────────────────

/// Distributed expression evaluator: compute agent.
#[derive(Parser, Debug)]
#[command(name = "exprflow-agent", version, about)]
struct Cli {
    /// Orchestrator base URL (overrides ORCHESTRATOR_URL).
    #[arg(long)]
    orchestrator_url: Option<String>,

    /// Number of concurrent workers (overrides COMPUTING_POWER).
    #[arg(long)]
    computing_power: Option<usize>,

    /// Idle poll interval in milliseconds (overrides AGENT_POLL_INTERVAL_MS).
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Name used as lease holder prefix. Random when omitted.
    #[arg(long, env = "AGENT_ID")]
    agent_id: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    config::load_dotenv();
    let mut config = Config::from_env();
    if let Some(url) = cli.orchestrator_url {
        config.agent.orchestrator_url = url;
    }
    if let Some(power) = cli.computing_power {
        config.agent.computing_power = power.max(1);
    }
    if let Some(ms) = cli.poll_interval_ms {
        config.agent.poll_interval_ms = ms.max(1);
    }
    config.log_summary();

    let name = cli
        .agent_id
        .unwrap_or_else(|| format!("agent-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]));
    let client = Arc::new(HttpSchedulerClient::new(&config.agent.orchestrator_url)?);
    let agent = Agent::new(client, AgentSettings::from_config(&config.agent, name));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        os_signal().await;
        info!("shutdown signal received, finishing in-flight tasks");
        let _ = shutdown_tx.send(true);
    });

    agent.run(shutdown_rx).await;
    info!(completed = agent.completed(), "agent exited");
    Ok(())
}
