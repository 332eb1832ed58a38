//! taskgate CLI
//!
//! Shell and log access to swarm workloads through the taskgate gateway:
//! - `exec` opens an interactive (or piped) command session
//! - `logs` prints container logs, optionally following them
//! - `health` checks that the gateway is reachable

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskgate::client::GatewayClient;
use taskgate::commands;
use taskgate::output::print_error;
use tg_core::config::{self, ClientConfig};
use tg_core::tls;
use tg_protocol::Tail;

#[derive(Parser)]
#[command(name = "taskgate")]
#[command(author, version, about = "Shell and log access to swarm workloads")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Gateway URL, e.g. wss://gateway.example:8443
    #[arg(long, global = true, env = "TASKGATE_GATEWAY")]
    gateway: Option<String>,

    /// Client certificate (PEM)
    #[arg(long, global = true)]
    cert: Option<PathBuf>,

    /// Client private key (PEM)
    #[arg(long, global = true)]
    key: Option<PathBuf>,

    /// CA bundle the gateway certificate must chain to (PEM)
    #[arg(long, global = true)]
    ca: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command inside a workload's container
    Exec {
        /// Workload (task) id
        workload: String,
        /// Command to run (defaults to a shell)
        #[arg(long)]
        cmd: Option<String>,
    },

    /// Print a workload's container logs
    Logs {
        /// Workload (task) id
        workload: String,
        /// Keep streaming new output
        #[arg(short, long)]
        follow: bool,
        /// Lines of history to replay: a number or "all"
        #[arg(short = 'n', long)]
        tail: Option<Tail>,
    },

    /// Check that the gateway is up
    Health,
}

impl Cli {
    /// Apply command line overrides on top of the config file
    fn apply(&self, config: &mut ClientConfig) {
        if let Some(gateway) = &self.gateway {
            config.gateway_url = gateway.clone();
        }
        if let Some(path) = &self.cert {
            config.tls.cert_path = Some(path.clone());
        }
        if let Some(path) = &self.key {
            config.tls.key_path = Some(path.clone());
        }
        if let Some(path) = &self.ca {
            config.tls.ca_path = Some(path.clone());
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            print_error(&format!("{:#}", e));
            1
        }
    };

    // A pending stdin read cannot be cancelled and would block runtime shutdown
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<()> {
    tls::install_crypto_provider();

    let mut config: ClientConfig = config::load_or_default(cli.config.as_deref(), "client.toml")
        .context("Failed to load client configuration")?;
    cli.apply(&mut config);

    let client = GatewayClient::new(&config)?;

    match cli.command {
        Commands::Exec { workload, cmd } => {
            commands::exec_command(&client, &workload, cmd.as_deref()).await?;
        }
        Commands::Logs {
            workload,
            follow,
            tail,
        } => {
            commands::logs_command(&client, &workload, follow, tail).await?;
        }
        Commands::Health => {
            commands::health_command(&client).await?;
        }
    }

    Ok(())
}
