//! exprflow-server: the orchestrator.
//!
//! Accepts expressions on the public API, splits them into operator tasks
//! and serves those tasks to agents over the internal API.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use exprflow_core::config::{self, Config};
use exprflow_core::signal::os_signal;
use exprflow_scheduler::{Scheduler, SchedulerConfig};
use exprflow_server::reaper::run_lease_reaper;
use exprflow_server::{build_router, AppState};

// ── CLI ─────────────────────────────────────────────────────────────

/// Distributed expression evaluator: orchestrator.
#[derive(Parser, Debug)]
#[command(name = "exprflow-server", version, about)]
struct Cli {
    /// Bind address (overrides HOST).
    #[arg(long)]
    host: Option<String>,

    /// Listen port (overrides PORT).
    #[arg(long)]
    port: Option<u16>,

    /// Allowed CORS origin, `*` for any (overrides CORS_ORIGIN).
    #[arg(long)]
    cors_origin: Option<String>,
}

fn load_config(cli: Cli) -> Config {
    config::load_dotenv();
    let mut config = Config::from_env();
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(origin) = cli.cors_origin {
        config.server.cors_origin = origin;
    }
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config(Cli::parse());
    config.log_summary();

    let scheduler = Arc::new(Scheduler::new(SchedulerConfig::from_config(&config)));
    let state = Arc::new(AppState::new(Arc::clone(&scheduler)));
    let app = build_router(state, &config.server.cors_origin);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reaper = tokio::spawn(run_lease_reaper(
        scheduler,
        Duration::from_millis(config.scheduler.lease_reap_interval_ms),
        shutdown_rx,
    ));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            os_signal().await;
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    reaper.await?;
    info!("server stopped");
    Ok(())
}
