//! taskgate helper daemon
//!
//! Runs on every node, next to the container runtime, and executes the
//! sessions the gateway forwards to it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tg_core::config::{self, HelperConfig};
use tg_helper::runtime::DockerRuntime;
use tg_helper::{HelperServer, HelperState};

#[derive(Parser)]
#[command(name = "tg-helper")]
#[command(about = "taskgate helper daemon - executes sessions on the local container runtime")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (overrides config)
    #[arg(short, long, env = "AGENT_LISTEN")]
    bind: Option<String>,

    /// Exec liveness poll interval in milliseconds (overrides config)
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Run in foreground with verbose output
    #[arg(short, long)]
    foreground: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.foreground { "debug" } else { &args.log_level };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("taskgate helper starting...");

    let mut config: HelperConfig = config::load_or_default(args.config.as_deref(), "helper.toml")
        .context("Failed to load helper configuration")?;
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }
    if let Some(ms) = args.poll_interval_ms {
        config.poll_interval = Duration::from_millis(ms.max(1));
    }

    let runtime = DockerRuntime::connect().context("Failed to connect to the container runtime")?;
    let state = Arc::new(HelperState::new(config, Arc::new(runtime)));

    // Create cancellation token for graceful shutdown
    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    HelperServer::new(state)
        .with_shutdown_token(cancel)
        .run()
        .await?;

    tracing::info!("Helper shutdown complete");
    Ok(())
}

/// Cancel `cancel` on Ctrl+C or SIGTERM
fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, initiating shutdown...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating shutdown...");
            }
        }

        cancel.cancel();
    });
}
