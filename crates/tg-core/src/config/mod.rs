//! Configuration management for taskgate

mod client;
mod gateway;
mod helper;
pub mod serde_utils;

pub use client::ClientConfig;
pub use gateway::GatewayConfig;
pub use helper::HelperConfig;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskgate")
}

/// Load configuration from a file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Load an explicitly requested file, or fall back to `file_name` in the
/// default directory, or to defaults when that does not exist either.
///
/// An explicit path that cannot be loaded is an error; a broken default
/// file is only logged.
pub fn load_or_default<T>(explicit: Option<&Path>, file_name: &str) -> Result<T, ConfigError>
where
    T: serde::de::DeserializeOwned + Default,
{
    if let Some(path) = explicit {
        return load_config(path);
    }

    let default_path = default_config_dir().join(file_name);
    if !default_path.exists() {
        tracing::info!("Using default configuration");
        return Ok(T::default());
    }

    Ok(load_config(&default_path).unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from {:?}: {}", default_path, e);
        T::default()
    }))
}

/// Parse a listen address; a bare `:port` binds all interfaces
pub fn parse_bind_address(address: &str) -> Result<SocketAddr, ConfigError> {
    let address = address.trim();
    let full = if address.starts_with(':') {
        format!("0.0.0.0{}", address)
    } else {
        address.to_string()
    };

    full.parse()
        .map_err(|_| ConfigError::InvalidAddress(address.to_string()))
}

/// PEM files making up one side of a mutual TLS handshake
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsPaths {
    /// Certificate chain presented to the peer
    pub cert_path: Option<PathBuf>,
    /// Private key for `cert_path`
    pub key_path: Option<PathBuf>,
    /// CA bundle the peer's certificate must chain to
    pub ca_path: Option<PathBuf>,
}

impl TlsPaths {
    /// All three paths, or the name of the first missing one
    pub fn require(&self, prefix: &str) -> Result<(&Path, &Path, &Path), ConfigError> {
        let missing = |field: &str| ConfigError::MissingField(format!("{}.{}", prefix, field));

        Ok((
            self.cert_path.as_deref().ok_or_else(|| missing("cert_path"))?,
            self.key_path.as_deref().ok_or_else(|| missing("key_path"))?,
            self.ca_path.as_deref().ok_or_else(|| missing("ca_path"))?,
        ))
    }
}
