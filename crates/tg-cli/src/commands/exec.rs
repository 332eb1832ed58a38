//! Exec command implementation

use std::io::IsTerminal;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use tg_protocol::{ExecParams, SessionParams, SessionRequest};

use crate::client::GatewayClient;
use crate::output::{print_info, print_warning};
use crate::session::{run_exec, RawMode, SessionEnd};

/// Run a command in a workload's container, attached to this terminal
pub async fn exec_command(
    client: &GatewayClient,
    workload: &str,
    command: Option<&str>,
) -> Result<()> {
    let interactive = std::io::stdin().is_terminal();
    let request = SessionRequest::new(
        workload,
        SessionParams::Exec(ExecParams {
            command: command.map(str::to_string),
            tty: interactive,
        }),
    );

    let session = client.open(&request).await?;

    let end = if interactive {
        print_info("Connected. Press Ctrl+] to detach");
        // Ctrl+C is forwarded to the remote process in raw mode
        let _raw = RawMode::enable()?;
        run_exec(
            session,
            tokio::io::stdin(),
            tokio::io::stdout(),
            true,
            CancellationToken::new(),
        )
        .await?
    } else {
        run_exec(
            session,
            tokio::io::stdin(),
            tokio::io::stdout(),
            false,
            super::interrupt_token(),
        )
        .await?
    };

    match end {
        SessionEnd::Finished | SessionEnd::Closed => {
            tracing::debug!("Exec session ended: {:?}", end);
        }
        SessionEnd::Detached => print_info("Detached from session"),
        SessionEnd::Interrupted => print_warning("Interrupted"),
    }
    Ok(())
}
