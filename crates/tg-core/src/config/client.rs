//! Interactive client configuration

use serde::{Deserialize, Serialize};

use super::TlsPaths;

/// Configuration for the `taskgate` client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Gateway base URL, e.g. `wss://gateway.example:8443`
    pub gateway_url: String,

    /// Client certificate, key and the CA that signs the gateway certificate
    pub tls: TlsPaths,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let config_dir = super::default_config_dir();

        Self {
            gateway_url: "wss://localhost:8443".to_string(),
            tls: TlsPaths {
                cert_path: Some(config_dir.join("client.crt")),
                key_path: Some(config_dir.join("client.key")),
                ca_path: Some(config_dir.join("ca.crt")),
            },
        }
    }
}
