//! Helper server integration tests
//!
//! Runs the real router on a loopback port against an in-process runtime
//! and talks to it with a WebSocket client, the way the gateway does.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, SinkExt, StreamExt};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use tg_core::config::HelperConfig;
use tg_core::error::RuntimeError;
use tg_core::traits::{
    ExecAttachment, ExecId, ExecSpec, LogChunk, LogOptions, LogStream, OutputChannel, Runtime,
};
use tg_core::CORRELATION_HEADER;
use tg_helper::{HelperServer, HelperState};

/// `echo` prints its arguments, `cat` copies stdin to stdout
#[derive(Default)]
struct ShellRuntime {
    next_id: AtomicUsize,
    execs: Mutex<HashMap<String, Vec<String>>>,
    last_logs: Mutex<Option<LogOptions>>,
}

#[async_trait]
impl Runtime for ShellRuntime {
    async fn inspect_container(&self, container_id: &str) -> Result<(), RuntimeError> {
        match container_id {
            "c-1" => Ok(()),
            other => Err(RuntimeError::NotFound(format!("No such container: {}", other))),
        }
    }

    async fn create_exec(
        &self,
        _container_id: &str,
        spec: &ExecSpec,
    ) -> Result<ExecId, RuntimeError> {
        let id = format!("exec-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.execs
            .lock()
            .unwrap()
            .insert(id.clone(), spec.argv.clone());
        Ok(ExecId(id))
    }

    async fn attach_exec(&self, exec: &ExecId, _tty: bool) -> Result<ExecAttachment, RuntimeError> {
        let argv = self.execs.lock().unwrap()[&exec.0].clone();

        match argv[0].as_str() {
            "echo" => {
                let line = format!("{}\n", argv[1..].join(" "));
                Ok(ExecAttachment {
                    output: Box::pin(stream::iter(vec![Ok(Bytes::from(line))])),
                    input: Box::pin(tokio::io::sink()),
                })
            }
            "cat" => {
                let (stdin, stdout) = tokio::io::duplex(1024);
                let output = stream::unfold(stdout, |mut stdout| async move {
                    let mut buf = vec![0u8; 1024];
                    match stdout.read(&mut buf).await {
                        Ok(0) | Err(_) => None,
                        Ok(n) => {
                            buf.truncate(n);
                            Some((Ok(Bytes::from(buf)), stdout))
                        }
                    }
                });
                Ok(ExecAttachment {
                    output: Box::pin(output),
                    input: Box::pin(stdin),
                })
            }
            other => Err(RuntimeError::Api(format!("{}: not found", other))),
        }
    }

    async fn exec_running(&self, exec: &ExecId) -> Result<bool, RuntimeError> {
        let argv = self.execs.lock().unwrap()[&exec.0].clone();
        Ok(argv[0] == "cat")
    }

    async fn logs(
        &self,
        container_id: &str,
        options: &LogOptions,
    ) -> Result<LogStream, RuntimeError> {
        self.inspect_container(container_id).await?;
        *self.last_logs.lock().unwrap() = Some(*options);

        Ok(Box::pin(stream::iter(vec![
            Ok(LogChunk::new(OutputChannel::Stdout, &b"booted\n"[..])),
            Ok(LogChunk::new(OutputChannel::Stderr, &b"warning\n"[..])),
        ])))
    }
}

struct TestHelper {
    address: String,
    runtime: Arc<ShellRuntime>,
    cancel: CancellationToken,
}

impl Drop for TestHelper {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn start_helper() -> TestHelper {
    let runtime = Arc::new(ShellRuntime::default());
    let config = HelperConfig {
        poll_interval: Duration::from_millis(50),
        ..HelperConfig::default()
    };
    let state = Arc::new(HelperState::new(config, runtime.clone()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let cancel = CancellationToken::new();

    let server = HelperServer::new(state).with_shutdown_token(cancel.clone());
    tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });

    TestHelper {
        address,
        runtime,
        cancel,
    }
}

type Socket = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn connect(helper: &TestHelper, path_and_query: &str) -> Socket {
    let url = format!("ws://{}{}", helper.address, path_and_query);
    let (socket, _) = tokio_tungstenite::connect_async(url)
        .await
        .expect("Failed to connect to helper");
    socket
}

/// Next data or close message, skipping control frames
async fn next_message(socket: &mut Socket) -> Option<Message> {
    loop {
        let message = timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("Timed out waiting for helper")?;
        match message {
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(message) => return Some(message),
            Err(_) => return None,
        }
    }
}

#[tokio::test]
async fn test_health() {
    let helper = start_helper().await;

    let body: serde_json::Value = reqwest::get(format!("http://{}/health", helper.address))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "ok");
    let ts = body["ts"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok(), "{}", ts);
}

#[tokio::test]
async fn test_exec_echo() {
    let helper = start_helper().await;
    let mut socket = connect(&helper, "/v1/exec?container_id=c-1&cmd=echo%20hi&tty=false").await;

    assert_eq!(
        next_message(&mut socket).await,
        Some(Message::Text("EXEC_ATTACHED".into()))
    );
    assert_eq!(
        next_message(&mut socket).await,
        Some(Message::Binary(b"hi\n".to_vec().into()))
    );
    assert_eq!(
        next_message(&mut socket).await,
        Some(Message::Text("EXEC_FINISHED".into()))
    );
    assert!(matches!(
        next_message(&mut socket).await,
        Some(Message::Close(_)) | None
    ));
}

#[tokio::test]
async fn test_exec_interactive_input() {
    let helper = start_helper().await;
    let mut socket = connect(&helper, "/v1/exec?container_id=c-1&cmd=cat").await;

    assert_eq!(
        next_message(&mut socket).await,
        Some(Message::Text("EXEC_ATTACHED".into()))
    );

    socket.send(Message::Text("ping\n".into())).await.unwrap();
    assert_eq!(
        next_message(&mut socket).await,
        Some(Message::Binary(b"ping\n".to_vec().into()))
    );

    socket.close(None).await.unwrap();
}

#[tokio::test]
async fn test_missing_container_id() {
    let helper = start_helper().await;
    let mut socket = connect(&helper, "/v1/exec?cmd=ls").await;

    assert_eq!(
        next_message(&mut socket).await,
        Some(Message::Text("error: missing identifier".into()))
    );
    assert!(matches!(
        next_message(&mut socket).await,
        Some(Message::Close(_)) | None
    ));
    assert!(helper.runtime.execs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_container() {
    let helper = start_helper().await;
    let mut socket = connect(&helper, "/v1/exec?container_id=c-404").await;

    match next_message(&mut socket).await {
        Some(Message::Text(text)) => {
            assert!(text.starts_with("error: inspect:"), "{}", text);
        }
        other => panic!("expected error frame, got {:?}", other),
    }
}

#[tokio::test]
async fn test_logs_without_follow() {
    let helper = start_helper().await;
    let mut socket = connect(&helper, "/v1/logs?container_id=c-1&follow=0&tail=20").await;

    assert_eq!(
        next_message(&mut socket).await,
        Some(Message::Binary(b"booted\n".to_vec().into()))
    );
    assert_eq!(
        next_message(&mut socket).await,
        Some(Message::Binary(b"warning\n".to_vec().into()))
    );
    assert!(matches!(
        next_message(&mut socket).await,
        Some(Message::Close(_)) | None
    ));

    let options = helper.runtime.last_logs.lock().unwrap().unwrap();
    assert!(!options.follow);
    assert_eq!(options.tail.to_string(), "20");
}

#[tokio::test]
async fn test_correlation_header_is_accepted() {
    let helper = start_helper().await;

    let mut request = format!("ws://{}/v1/exec?container_id=c-1&cmd=echo%20ok", helper.address)
        .into_client_request()
        .unwrap();
    request.headers_mut().insert(
        CORRELATION_HEADER,
        "6f1c1a52-9d0e-4c47-8d7b-0b1e8b9b7c11".parse().unwrap(),
    );
    let (mut socket, _) = tokio_tungstenite::connect_async(request).await.unwrap();

    assert_eq!(
        next_message(&mut socket).await,
        Some(Message::Text("EXEC_ATTACHED".into()))
    );
    assert_eq!(
        next_message(&mut socket).await,
        Some(Message::Binary(b"ok\n".to_vec().into()))
    );
}

#[tokio::test]
async fn test_bare_port_listens_on_all_interfaces() {
    let config = HelperConfig {
        bind_address: ":0".to_string(),
        ..HelperConfig::default()
    };
    let state = Arc::new(HelperState::new(config, Arc::new(ShellRuntime::default())));
    let cancel = CancellationToken::new();
    let server = HelperServer::new(state).with_shutdown_token(cancel.clone());

    let listener = server.bind().await.unwrap();
    let local = listener.local_addr().unwrap();
    assert!(local.ip().is_unspecified());
    assert_ne!(local.port(), 0);

    let task = tokio::spawn(async move { server.serve(listener).await });

    let response = reqwest::get(format!("http://127.0.0.1:{}/health", local.port()))
        .await
        .unwrap();
    assert!(response.status().is_success());

    cancel.cancel();
    timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_invalid_listen_address_is_rejected() {
    let config = HelperConfig {
        bind_address: "helper".to_string(),
        ..HelperConfig::default()
    };
    let state = Arc::new(HelperState::new(config, Arc::new(ShellRuntime::default())));

    let err = HelperServer::new(state).run().await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid listen address: helper");
}
