//! Gateway configuration

use serde::{Deserialize, Serialize};

use super::TlsPaths;

/// Configuration for the gateway daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Address the mTLS listener binds to
    pub bind_address: String,

    /// Server certificate, key and the CA that signs client certificates
    pub tls: TlsPaths,

    /// Orchestrator service name of the per-node helper
    pub helper_service: String,

    /// Private overlay network shared by gateway and helpers
    pub overlay_network: String,

    /// Port helpers listen on inside the overlay
    pub helper_port: u16,

    /// Engine API of a manager node (`unix:///var/run/docker.sock`,
    /// `tcp://manager:2375`); `DOCKER_HOST` or the local socket when unset
    pub docker_host: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8443".to_string(),
            tls: TlsPaths::default(),
            helper_service: "stack_agent".to_string(),
            overlay_network: "agent-net".to_string(),
            helper_port: 8080,
            docker_host: None,
        }
    }
}
