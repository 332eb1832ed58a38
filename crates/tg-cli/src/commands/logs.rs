//! Logs command implementation

use anyhow::Result;

use tg_protocol::{LogsParams, SessionParams, SessionRequest, Tail};

use crate::client::GatewayClient;
use crate::output::print_warning;
use crate::session::{stream_logs, SessionEnd};

/// Print a workload's container logs
pub async fn logs_command(
    client: &GatewayClient,
    workload: &str,
    follow: bool,
    tail: Option<Tail>,
) -> Result<()> {
    let request = SessionRequest::new(
        workload,
        SessionParams::Logs(LogsParams {
            follow,
            tail: tail.unwrap_or_default(),
        }),
    );

    let session = client.open(&request).await?;

    if stream_logs(session, tokio::io::stdout(), super::interrupt_token()).await?
        == SessionEnd::Interrupted
    {
        print_warning("Interrupted");
    }
    Ok(())
}
