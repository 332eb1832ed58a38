//! Gateway transport security tests
//!
//! Serves the gateway through its rustls listener with the fixture PKI
//! under `tests/fixtures/`:
//! - `ca.crt` signs `gateway.crt` (127.0.0.1, localhost) and `client.crt`
//! - `rogue-client.crt` is signed by a CA the gateway does not trust

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use rustls::crypto::CryptoProvider;
use rustls::{ClientConfig, RootCertStore};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::Connector;
use tokio_util::sync::CancellationToken;

use tg_core::config::{GatewayConfig, TlsPaths};
use tg_core::tls;
use tg_gateway::directory::StaticDirectory;
use tg_gateway::{GatewayServer, GatewayState, WsDialer};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

fn roots() -> RootCertStore {
    tls::load_root_store(&fixture("ca.crt")).unwrap()
}

struct TestGateway {
    port: u16,
    cancel: CancellationToken,
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn start_gateway() -> TestGateway {
    let config = GatewayConfig {
        tls: TlsPaths {
            cert_path: Some(fixture("gateway.crt")),
            key_path: Some(fixture("gateway.key")),
            ca_path: Some(fixture("ca.crt")),
        },
        ..GatewayConfig::default()
    };
    let state = Arc::new(GatewayState::new(
        config,
        Arc::new(StaticDirectory::new()),
        Arc::new(WsDialer),
    ));

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let cancel = CancellationToken::new();

    let server = GatewayServer::new(state).with_shutdown_token(cancel.clone());
    tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });

    TestGateway { port, cancel }
}

/// Client identity the gateway trusts, TLS 1.3 only
fn operator() -> ClientConfig {
    let config = tls::client_config(
        &fixture("client.crt"),
        &fixture("client.key"),
        &fixture("ca.crt"),
    )
    .unwrap();
    (*config).clone()
}

async fn health(gateway: &TestGateway, config: ClientConfig) -> reqwest::Result<reqwest::Response> {
    let client = reqwest::Client::builder()
        .use_preconfigured_tls(config)
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    client
        .get(format!("https://127.0.0.1:{}/health", gateway.port))
        .send()
        .await?
        .error_for_status()
}

#[tokio::test]
async fn test_trusted_client_reaches_health() {
    let gateway = start_gateway().await;

    let body: serde_json::Value = health(&gateway, operator())
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_client_without_certificate_is_refused() {
    let gateway = start_gateway().await;
    let config = ClientConfig::builder_with_provider(provider())
        .with_protocol_versions(&[&rustls::version::TLS13])
        .unwrap()
        .with_root_certificates(roots())
        .with_no_client_auth();

    assert!(health(&gateway, config).await.is_err());
}

#[tokio::test]
async fn test_client_from_untrusted_ca_is_refused() {
    let gateway = start_gateway().await;
    let config = ClientConfig::builder_with_provider(provider())
        .with_protocol_versions(&[&rustls::version::TLS13])
        .unwrap()
        .with_root_certificates(roots())
        .with_client_auth_cert(
            tls::load_certs(&fixture("rogue-client.crt")).unwrap(),
            tls::load_private_key(&fixture("rogue-client.key")).unwrap(),
        )
        .unwrap();

    assert!(health(&gateway, config).await.is_err());
}

#[tokio::test]
async fn test_tls12_client_is_refused() {
    let gateway = start_gateway().await;
    let config = ClientConfig::builder_with_provider(provider())
        .with_protocol_versions(&[&rustls::version::TLS12])
        .unwrap()
        .with_root_certificates(roots())
        .with_client_auth_cert(
            tls::load_certs(&fixture("client.crt")).unwrap(),
            tls::load_private_key(&fixture("client.key")).unwrap(),
        )
        .unwrap();

    assert!(health(&gateway, config).await.is_err());
}

#[tokio::test]
async fn test_session_upgrade_over_mtls() {
    let gateway = start_gateway().await;
    let url = format!("wss://127.0.0.1:{}/v1/exec", gateway.port);

    let (mut socket, _) = tokio_tungstenite::connect_async_tls_with_config(
        url,
        None,
        false,
        Some(Connector::Rustls(Arc::new(operator()))),
    )
    .await
    .expect("mTLS upgrade failed");

    let message = timeout(Duration::from_secs(5), socket.next())
        .await
        .expect("timed out waiting for gateway")
        .unwrap()
        .unwrap();
    assert_eq!(message, Message::Text("error: missing identifier".into()));
}
