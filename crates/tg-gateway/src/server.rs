//! Gateway HTTPS server
//!
//! Serves `/health` and the two session endpoints over TLS 1.3 with
//! mandatory client certificates.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use tg_core::config::parse_bind_address;
use tg_core::{tls, CorrelationId, Duplex};
use tg_protocol::{SessionKind, SessionQuery};

use crate::state::GatewayState;

/// In-flight sessions get this long to finish after shutdown is requested
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Build the gateway router
pub fn router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(SessionKind::Exec.path(), get(exec_session))
        .route(SessionKind::Logs.path(), get(logs_session))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn exec_session(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<SessionQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    upgrade(SessionKind::Exec, state, query, ws)
}

async fn logs_session(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<SessionQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    upgrade(SessionKind::Logs, state, query, ws)
}

fn upgrade(
    kind: SessionKind,
    state: Arc<GatewayState>,
    query: SessionQuery,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| {
        let id = CorrelationId::new();
        let span = tracing::info_span!("session", id = %id, kind = %kind);

        async move {
            tracing::info!("Session opened");
            let client = Duplex::from_axum(socket);

            match state.bridge.run(kind, &query, client, id).await {
                Ok(end) => tracing::info!("Session closed by {:?}", end),
                Err(e) => tracing::info!("Session ended: {}", e),
            }
        }
        .instrument(span)
    })
}

/// Gateway HTTPS server
pub struct GatewayServer {
    state: Arc<GatewayState>,
    /// Cancellation token for shutdown
    shutdown_token: Option<CancellationToken>,
}

impl GatewayServer {
    /// Create a new server
    pub fn new(state: Arc<GatewayState>) -> Self {
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
        let address = parse_bind_address(&self.state.config.bind_address)?;
        let listener = std::net::TcpListener::bind(address)
            .with_context(|| format!("Failed to bind gateway to {}", address))?;

        self.serve(listener).await
    }

    /// Load TLS material and serve on an already bound listener
    pub async fn serve(&self, listener: std::net::TcpListener) -> Result<()> {
        let (cert, key, ca) = self.state.config.tls.require("tls")?;
        let tls_config = tls::server_config(cert, key, ca)
            .context("Failed to load gateway TLS material")?;
        let address = listener.local_addr()?;

        let handle = Handle::new();
        if let Some(token) = self.shutdown_token.clone() {
            let handle = handle.clone();
            tokio::spawn(async move {
                token.cancelled().await;
                tracing::info!("Stopping gateway listener");
                handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
            });
        }

        tracing::info!("Gateway listening on {} (mTLS)", address);
        axum_server::from_tcp_rustls(listener, RustlsConfig::from_config(tls_config))
            .handle(handle)
            .serve(router(Arc::clone(&self.state)).into_make_service())
            .await
            .with_context(|| format!("Gateway server on {} failed", address))?;

        tracing::info!("Gateway server stopped");
        Ok(())
    }
}
