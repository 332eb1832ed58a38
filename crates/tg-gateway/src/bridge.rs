//! Session bridge
//!
//! Validates an inbound session, resolves and dials the helper, then relays
//! frames untouched in both directions. Failures before the relay starts are
//! reported to the client as a single `error:` frame; nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};

use tg_core::error::{SessionError, TransportError};
use tg_core::transport::{FrameSink, FrameStream};
use tg_core::{CorrelationId, Duplex, WorkloadId};
use tg_protocol::{IdentifierField, SessionKind, SessionQuery, SessionRequest};

use crate::dialer::HelperDialer;
use crate::resolver::EndpointResolver;

/// How long closing a leg may take once the relay is over
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Which leg ended the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEnd {
    /// Client closed or hung up
    Client,
    /// Helper closed or hung up
    Helper,
}

/// Bridges client sessions to helpers
pub struct SessionBridge {
    resolver: EndpointResolver,
    dialer: Arc<dyn HelperDialer>,
}

impl SessionBridge {
    /// Create a bridge
    pub fn new(resolver: EndpointResolver, dialer: Arc<dyn HelperDialer>) -> Self {
        Self { resolver, dialer }
    }

    /// Serve one client session until either side ends it
    pub async fn run(
        &self,
        kind: SessionKind,
        query: &SessionQuery,
        client: Duplex,
        id: CorrelationId,
    ) -> Result<RelayEnd, SessionError> {
        let helper = match self.open(kind, query, id).await {
            Ok(helper) => helper,
            Err(e) => {
                tracing::warn!("Session rejected: {}", e);
                client.reject(&e).await;
                return Err(e);
            }
        };

        relay(client, helper).await
    }

    /// Validate, resolve and dial
    async fn open(
        &self,
        kind: SessionKind,
        query: &SessionQuery,
        id: CorrelationId,
    ) -> Result<Duplex, SessionError> {
        let request = SessionRequest::from_query(kind, IdentifierField::Workload, query)?;
        let workload = WorkloadId::new(request.target.as_str());

        let resolution = self.resolver.resolve(&workload).await?;
        tracing::info!(
            "Workload {} -> container {} on {} (helper {})",
            workload,
            resolution.container_id,
            resolution.node_id,
            resolution.endpoint
        );

        let helper_request = request.retarget(resolution.container_id);
        self.dialer
            .dial(resolution.endpoint, &helper_request, id)
            .await
    }
}

/// Relay frames between two legs until one of them ends.
///
/// Both copy loops race; the loser is dropped and both sinks are closed.
pub async fn relay(client: Duplex, helper: Duplex) -> Result<RelayEnd, SessionError> {
    let (mut client_sink, mut client_stream) = client.split();
    let (mut helper_sink, mut helper_stream) = helper.split();

    let (end, result) = tokio::select! {
        result = copy(&mut client_stream, &mut helper_sink) => (RelayEnd::Client, result),
        result = copy(&mut helper_stream, &mut client_sink) => (RelayEnd::Helper, result),
    };

    tokio::join!(
        close_leg(&mut helper_sink, RelayEnd::Helper),
        close_leg(&mut client_sink, RelayEnd::Client),
    );

    match result {
        Ok(()) => {
            tracing::debug!("Relay ended by {:?}", end);
            Ok(end)
        }
        Err(e) => {
            tracing::debug!("Relay broken ({:?} side): {}", end, e);
            Err(e.into())
        }
    }
}

/// Close one leg; a peer that stopped reading is abandoned after
/// [`CLOSE_TIMEOUT`]
async fn close_leg(sink: &mut FrameSink, leg: RelayEnd) {
    match tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!("Closing {:?} leg failed: {}", leg, e),
        Err(_) => tracing::debug!("Closing {:?} leg timed out", leg),
    }
}

/// Forward frames until the source closes; errors on either side end it
async fn copy(from: &mut FrameStream, to: &mut FrameSink) -> Result<(), TransportError> {
    while let Some(frame) = from.next().await {
        let frame = frame?;
        if frame.is_close() {
            return Ok(());
        }
        to.send(frame).await?;
    }
    Ok(())
}
