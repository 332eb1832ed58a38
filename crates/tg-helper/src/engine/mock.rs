//! Scripted runtime for engine tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::channel::mpsc;
use futures::{stream, StreamExt};
use tokio::io::DuplexStream;

use tg_core::error::RuntimeError;
use tg_core::traits::{
    ExecAttachment, ExecId, ExecSpec, LogChunk, LogOptions, LogStream, Runtime,
};

/// The only container the mock knows
pub const CONTAINER: &str = "c-1";

/// Sets its flag when dropped
struct ReleaseGuard(Arc<AtomicBool>);

impl ReleaseGuard {
    fn hold(&self) {}
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

struct PendingExec {
    output: mpsc::UnboundedReceiver<Result<Bytes, RuntimeError>>,
    input: DuplexStream,
}

#[derive(Default)]
struct Inner {
    create_error: Mutex<Option<String>>,
    exec: Mutex<Option<PendingExec>>,
    running: Arc<AtomicBool>,
    exec_released: Arc<AtomicBool>,
    created: Mutex<Vec<Vec<String>>>,
    log_chunks: Mutex<Vec<LogChunk>>,
    log_options: Mutex<Vec<LogOptions>>,
    logs_released: Arc<AtomicBool>,
}

#[derive(Clone, Default)]
pub struct MockRuntime {
    inner: Arc<Inner>,
}

/// Test-side controls of the one scripted exec
pub struct ExecHandle {
    output: mpsc::UnboundedSender<Result<Bytes, RuntimeError>>,
    stdin: DuplexStream,
    running: Arc<AtomicBool>,
    released: Arc<AtomicBool>,
}

impl ExecHandle {
    pub fn emit(&self, data: &[u8]) {
        let _ = self.output.unbounded_send(Ok(Bytes::copy_from_slice(data)));
    }

    pub fn fail_output(&self, cause: &str) {
        let _ = self
            .output
            .unbounded_send(Err(RuntimeError::Stream(cause.to_string())));
    }

    pub fn finish_output(&self) {
        self.output.close_channel();
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub fn stdin(&mut self) -> &mut DuplexStream {
        &mut self.stdin
    }

    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_create(self, cause: &str) -> Self {
        *self.inner.create_error.lock().unwrap() = Some(cause.to_string());
        self
    }

    pub fn with_logs(self, chunks: Vec<LogChunk>) -> Self {
        *self.inner.log_chunks.lock().unwrap() = chunks;
        self
    }

    /// Script the next exec and get its controls
    pub fn exec_handle(&self) -> ExecHandle {
        let (output_tx, output_rx) = mpsc::unbounded();
        let (process_side, test_side) = tokio::io::duplex(1024);

        *self.inner.exec.lock().unwrap() = Some(PendingExec {
            output: output_rx,
            input: process_side,
        });
        self.inner.running.store(true, Ordering::SeqCst);

        ExecHandle {
            output: output_tx,
            stdin: test_side,
            running: self.inner.running.clone(),
            released: self.inner.exec_released.clone(),
        }
    }

    pub fn created_argv(&self) -> Vec<Vec<String>> {
        self.inner.created.lock().unwrap().clone()
    }

    pub fn log_options(&self) -> Vec<LogOptions> {
        self.inner.log_options.lock().unwrap().clone()
    }

    pub fn logs_released(&self) -> bool {
        self.inner.logs_released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Runtime for MockRuntime {
    async fn inspect_container(&self, container_id: &str) -> Result<(), RuntimeError> {
        if container_id == CONTAINER {
            Ok(())
        } else {
            Err(RuntimeError::NotFound(container_id.to_string()))
        }
    }

    async fn create_exec(
        &self,
        _container_id: &str,
        spec: &ExecSpec,
    ) -> Result<ExecId, RuntimeError> {
        if let Some(cause) = self.inner.create_error.lock().unwrap().clone() {
            return Err(RuntimeError::Api(cause));
        }
        self.inner.created.lock().unwrap().push(spec.argv.clone());
        Ok(ExecId("exec-1".to_string()))
    }

    async fn attach_exec(&self, _exec: &ExecId, _tty: bool) -> Result<ExecAttachment, RuntimeError> {
        let pending = self
            .inner
            .exec
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| RuntimeError::Api("no exec scripted".to_string()))?;

        let guard = ReleaseGuard(self.inner.exec_released.clone());
        let output = pending.output.map(move |item| {
            guard.hold();
            item
        });

        Ok(ExecAttachment {
            output: Box::pin(output),
            input: Box::pin(pending.input),
        })
    }

    async fn exec_running(&self, _exec: &ExecId) -> Result<bool, RuntimeError> {
        Ok(self.inner.running.load(Ordering::SeqCst))
    }

    async fn logs(
        &self,
        container_id: &str,
        options: &LogOptions,
    ) -> Result<LogStream, RuntimeError> {
        self.inspect_container(container_id).await?;
        self.inner.log_options.lock().unwrap().push(*options);

        let chunks = self.inner.log_chunks.lock().unwrap().clone();
        let history = stream::iter(chunks.into_iter().map(Ok));
        let guard = ReleaseGuard(self.inner.logs_released.clone());

        let logs: LogStream = if options.follow {
            Box::pin(history.chain(stream::pending()).map(move |item| {
                guard.hold();
                item
            }))
        } else {
            Box::pin(history.map(move |item| {
                guard.hold();
                item
            }))
        };
        Ok(logs)
    }
}
