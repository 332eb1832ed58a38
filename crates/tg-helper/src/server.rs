//! Helper HTTP server
//!
//! Plain HTTP inside the private overlay network. Serves `/health` and the
//! two session endpoints; the gateway is the only expected caller.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use tg_core::config::parse_bind_address;
use tg_core::{CorrelationId, Duplex, CORRELATION_HEADER};
use tg_protocol::{IdentifierField, SessionKind, SessionQuery, SessionRequest};

use crate::state::HelperState;

/// Build the helper router
pub fn router(state: Arc<HelperState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(SessionKind::Exec.path(), get(exec_session))
        .route(SessionKind::Logs.path(), get(logs_session))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "ts": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    }))
}

async fn exec_session(
    State(state): State<Arc<HelperState>>,
    Query(query): Query<SessionQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    upgrade(SessionKind::Exec, state, query, &headers, ws)
}

async fn logs_session(
    State(state): State<Arc<HelperState>>,
    Query(query): Query<SessionQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    upgrade(SessionKind::Logs, state, query, &headers, ws)
}

/// Correlation id sent by the gateway, or a fresh one
fn correlation_id(headers: &HeaderMap) -> CorrelationId {
    headers
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or_default()
}

/// Accept the upgrade, then validate over the socket so errors reach the
/// caller as an `error:` frame.
fn upgrade(
    kind: SessionKind,
    state: Arc<HelperState>,
    query: SessionQuery,
    headers: &HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let id = correlation_id(headers);

    ws.on_upgrade(move |socket| {
        let span = tracing::info_span!("session", id = %id, kind = %kind);

        async move {
            let caller = Duplex::from_axum(socket);

            let request =
                match SessionRequest::from_query(kind, IdentifierField::Container, &query) {
                    Ok(request) => request,
                    Err(e) => {
                        tracing::warn!("Rejected {} request: {}", kind, e);
                        caller.reject(e).await;
                        return;
                    }
                };

            tracing::info!("Session opened for container {}", request.target);
            match state.engine.run(request, caller).await {
                Ok(()) => tracing::info!("Session complete"),
                Err(e) => tracing::info!("Session ended: {}", e),
            }
        }
        .instrument(span)
    })
}

/// Helper HTTP server
pub struct HelperServer {
    state: Arc<HelperState>,
    /// Cancellation token for shutdown
    shutdown_token: Option<CancellationToken>,
}

impl HelperServer {
    /// Create a new server
    pub fn new(state: Arc<HelperState>) -> Self {
        Self {
            state,
            shutdown_token: None,
        }
    }

    /// Set the shutdown token (call before run)
    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown_token = Some(token);
        self
    }

    /// Bind the configured address and serve until shutdown
    pub async fn run(&self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Bind the configured address; `:port` listens on all interfaces
    pub async fn bind(&self) -> Result<TcpListener> {
        let address = parse_bind_address(&self.state.config.bind_address)?;
        TcpListener::bind(address)
            .await
            .with_context(|| format!("Failed to bind helper to {}", address))
    }

    /// Serve on an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        tracing::info!("Helper listening on {}", listener.local_addr()?);

        let token = self.shutdown_token.clone().unwrap_or_default();
        axum::serve(listener, router(Arc::clone(&self.state)))
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await
            .context("Helper server failed")?;

        tracing::info!("Helper server stopped");
        Ok(())
    }
}
