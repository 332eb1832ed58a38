//! taskgate gateway daemon
//!
//! The externally reachable entry point. Terminates mutual TLS, resolves
//! workloads through the swarm manager and bridges sessions to the helper
//! on the workload's node.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tg_core::config::{self, GatewayConfig};
use tg_core::tls;
use tg_gateway::directory::DockerDirectory;
use tg_gateway::{GatewayServer, GatewayState, WsDialer};

#[derive(Parser)]
#[command(name = "tg-gateway")]
#[command(about = "taskgate gateway - mTLS front door for exec and logs sessions")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (overrides config)
    #[arg(short, long, env = "PROXY_LISTEN")]
    bind: Option<String>,

    /// Server certificate (PEM)
    #[arg(long, env = "PROXY_TLS_CERT")]
    tls_cert: Option<PathBuf>,

    /// Server private key (PEM)
    #[arg(long, env = "PROXY_TLS_KEY")]
    tls_key: Option<PathBuf>,

    /// CA bundle client certificates must chain to (PEM)
    #[arg(long, env = "PROXY_CA_CERT")]
    ca_cert: Option<PathBuf>,

    /// Service name of the per-node helper
    #[arg(long, env = "AGENT_SERVICE")]
    helper_service: Option<String>,

    /// Private overlay network shared with helpers
    #[arg(long, env = "OVERLAY_NAME")]
    overlay_network: Option<String>,

    /// Port helpers listen on
    #[arg(long)]
    helper_port: Option<u16>,

    /// Engine API of a swarm manager (defaults to DOCKER_HOST or the local socket)
    #[arg(long)]
    docker_host: Option<String>,

    /// Run in foreground with verbose output
    #[arg(short, long)]
    foreground: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    /// Apply command line and environment overrides
    fn apply(self, config: &mut GatewayConfig) {
        if let Some(bind) = self.bind {
            config.bind_address = bind;
        }
        if let Some(path) = self.tls_cert {
            config.tls.cert_path = Some(path);
        }
        if let Some(path) = self.tls_key {
            config.tls.key_path = Some(path);
        }
        if let Some(path) = self.ca_cert {
            config.tls.ca_path = Some(path);
        }
        if let Some(service) = self.helper_service {
            config.helper_service = service;
        }
        if let Some(network) = self.overlay_network {
            config.overlay_network = network;
        }
        if let Some(port) = self.helper_port {
            config.helper_port = port;
        }
        if let Some(host) = self.docker_host {
            config.docker_host = Some(host);
        }
    }
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

    tracing::info!("taskgate gateway starting...");
    tls::install_crypto_provider();

    let mut config: GatewayConfig =
        config::load_or_default(args.config.as_deref(), "gateway.toml")
            .context("Failed to load gateway configuration")?;
    args.apply(&mut config);

    tracing::info!(
        "Helpers: service {} on network {} port {}",
        config.helper_service,
        config.overlay_network,
        config.helper_port
    );

    let directory = DockerDirectory::connect(config.docker_host.as_deref())
        .context("Failed to configure the swarm directory")?;
    tracing::info!("Swarm directory: {}", directory.host());
    let directory = Arc::new(directory);
    let state = Arc::new(GatewayState::new(config, directory, Arc::new(WsDialer)));

    // Create cancellation token for graceful shutdown
    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    GatewayServer::new(state)
        .with_shutdown_token(cancel)
        .run()
        .await?;

    tracing::info!("Gateway shutdown complete");
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
