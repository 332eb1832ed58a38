//! Health command implementation

use anyhow::{bail, Result};

use crate::client::GatewayClient;
use crate::output::{format_health, print_success};

/// Check the gateway health endpoint
pub async fn health_command(client: &GatewayClient) -> Result<()> {
    let url = client.health_url()?;
    let health = client.health().await?;

    let summary = format_health(url.as_str(), &health);
    if !health.is_ok() {
        bail!(summary);
    }

    print_success(&summary);
    Ok(())
}
