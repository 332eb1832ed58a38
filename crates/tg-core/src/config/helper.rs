//! Helper configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use tg_protocol::DEFAULT_SHELL;

use super::serde_utils::duration_secs;

/// Configuration for the per-node helper daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HelperConfig {
    /// Address the helper listens on inside the overlay
    pub bind_address: String,

    /// How often a running exec is polled for exit
    #[serde(with = "duration_secs")]
    pub poll_interval: Duration,

    /// Command run when the caller sends none
    pub default_command: String,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            poll_interval: Duration::from_secs(1),
            default_command: DEFAULT_SHELL.to_string(),
        }
    }
}
