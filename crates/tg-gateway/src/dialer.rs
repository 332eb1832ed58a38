//! Outbound connections to node helpers

use async_trait::async_trait;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use url::Url;

use tg_core::error::SessionError;
use tg_core::{CorrelationId, Duplex, HelperEndpoint, CORRELATION_HEADER};
use tg_protocol::{IdentifierField, SessionRequest};

/// Opens the helper leg of a session
#[async_trait]
pub trait HelperDialer: Send + Sync {
    /// Connect to `endpoint` and submit `request` (already retargeted to a
    /// container id)
    async fn dial(
        &self,
        endpoint: HelperEndpoint,
        request: &SessionRequest,
        id: CorrelationId,
    ) -> Result<Duplex, SessionError>;
}

/// Plain WebSocket dialer for the private overlay
#[derive(Debug, Clone, Copy, Default)]
pub struct WsDialer;

/// `ws://<endpoint>/v1/<kind>?container_id=...` with canonical parameters
pub fn helper_url(endpoint: HelperEndpoint, request: &SessionRequest) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&format!("ws://{}{}", endpoint, request.kind().path()))?;
    url.query_pairs_mut()
        .extend_pairs(request.to_query_pairs(IdentifierField::Container));
    Ok(url)
}

fn dial_error(e: impl std::fmt::Display) -> SessionError {
    SessionError::Dial(e.to_string())
}

#[async_trait]
impl HelperDialer for WsDialer {
    async fn dial(
        &self,
        endpoint: HelperEndpoint,
        request: &SessionRequest,
        id: CorrelationId,
    ) -> Result<Duplex, SessionError> {
        let url = helper_url(endpoint, request).map_err(dial_error)?;
        tracing::debug!("Dialing helper {}", url);

        let mut upgrade = url.as_str().into_client_request().map_err(dial_error)?;
        let header = HeaderValue::from_str(&id.to_string()).map_err(dial_error)?;
        upgrade.headers_mut().insert(CORRELATION_HEADER, header);

        let (socket, _) = tokio_tungstenite::connect_async(upgrade)
            .await
            .map_err(dial_error)?;

        Ok(Duplex::from_tungstenite(socket))
    }
}
