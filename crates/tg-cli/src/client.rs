//! Gateway client
//!
//! Builds session and health URLs from the configured gateway base URL and
//! opens connections with the client certificate. `ws://` gateways are
//! dialed without TLS.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use tokio_tungstenite::Connector;
use url::Url;

use tg_core::config::{ClientConfig, TlsPaths};
use tg_core::{tls, Duplex};
use tg_protocol::{IdentifierField, SessionRequest};

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    /// Whether the gateway reported itself healthy
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Connection settings for one gateway
#[derive(Debug, Clone)]
pub struct GatewayClient {
    base: Url,
    tls: TlsPaths,
}

impl GatewayClient {
    /// Create a client from configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base = Url::parse(&config.gateway_url)
            .with_context(|| format!("Invalid gateway URL: {}", config.gateway_url))?;

        match base.scheme() {
            "wss" | "ws" => {}
            other => bail!("Unsupported gateway scheme '{}' (expected wss or ws)", other),
        }
        if base.host_str().is_none() {
            bail!("Gateway URL has no host: {}", config.gateway_url);
        }

        Ok(Self {
            base,
            tls: config.tls.clone(),
        })
    }

    fn secure(&self) -> bool {
        self.base.scheme() == "wss"
    }

    /// Upgrade URL for a session addressed by workload id
    pub fn session_url(&self, request: &SessionRequest) -> Url {
        let mut url = self.base.clone();
        url.set_path(request.kind().path());
        url.set_query(None);
        url.query_pairs_mut()
            .extend_pairs(request.to_query_pairs(IdentifierField::Workload));
        url
    }

    /// `https://<gateway>/health` (or `http` for plain gateways)
    pub fn health_url(&self) -> Result<Url> {
        let mut url = self.base.clone();
        let scheme = if self.secure() { "https" } else { "http" };
        url.set_scheme(scheme)
            .map_err(|_| anyhow!("Cannot derive health URL from {}", self.base))?;
        url.set_path("/health");
        url.set_query(None);
        Ok(url)
    }

    /// Open a session on the gateway
    pub async fn open(&self, request: &SessionRequest) -> Result<Duplex> {
        let url = self.session_url(request);
        tracing::debug!("Connecting to {}", url);

        let connector = if self.secure() {
            let (cert, key, ca) = self.tls.require("tls")?;
            let config = tls::client_config(cert, key, ca)
                .context("Failed to load client TLS material")?;
            Some(Connector::Rustls(config))
        } else {
            None
        };

        let (socket, _) =
            tokio_tungstenite::connect_async_tls_with_config(url.as_str(), None, false, connector)
                .await
                .with_context(|| format!("Failed to connect to gateway at {}", self.base))?;

        Ok(Duplex::from_tungstenite(socket))
    }

    /// Query the gateway health endpoint
    pub async fn health(&self) -> Result<HealthStatus> {
        let url = self.health_url()?;
        let client = self.http_client()?;

        let status = client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Health check against {} failed", url))?
            .error_for_status()
            .with_context(|| format!("Health check against {} failed", url))?
            .json::<HealthStatus>()
            .await
            .context("Gateway returned a malformed health response")?;

        Ok(status)
    }

    fn http_client(&self) -> Result<reqwest::Client> {
        let builder = reqwest::Client::builder().use_rustls_tls();
        if !self.secure() {
            return builder.build().context("Failed to build HTTP client");
        }

        let (cert, key, ca) = self.tls.require("tls")?;
        let mut identity = read(key)?;
        identity.extend(read(cert)?);

        builder
            .tls_built_in_root_certs(false)
            .add_root_certificate(
                reqwest::Certificate::from_pem(&read(ca)?)
                    .context("Invalid CA certificate")?,
            )
            .identity(reqwest::Identity::from_pem(&identity).context("Invalid client identity")?)
            .build()
            .context("Failed to build HTTP client")
    }
}

fn read(path: &std::path::Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}
