//! Container runtime trait
//!
//! The helper only needs five runtime capabilities. Handles returned here
//! are released by dropping them: dropping an [`ExecAttachment`] closes the
//! attach connection, dropping a [`LogStream`] cancels the log read.

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use tokio::io::AsyncWrite;

use tg_protocol::Tail;

use crate::error::RuntimeError;

/// Bytes produced by an attached exec
pub type OutputStream = Pin<Box<dyn Stream<Item = Result<Bytes, RuntimeError>> + Send>>;

/// Writer feeding the exec'd process's stdin
pub type InputSink = Pin<Box<dyn AsyncWrite + Send>>;

/// Log chunks tagged with the channel they came from
pub type LogStream = Pin<Box<dyn Stream<Item = Result<LogChunk, RuntimeError>> + Send>>;

/// Runtime-issued exec handle id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExecId(pub String);

impl fmt::Display for ExecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What to run inside the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecSpec {
    pub argv: Vec<String>,
    pub tty: bool,
}

/// Duplex attachment to a running exec
pub struct ExecAttachment {
    pub output: OutputStream,
    pub input: InputSink,
}

impl fmt::Debug for ExecAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecAttachment").finish_non_exhaustive()
    }
}

/// Output channel a log chunk was written to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputChannel {
    Stdout,
    Stderr,
    /// TTY output, stdout and stderr already merged
    Console,
}

/// One demultiplexed piece of log output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogChunk {
    pub channel: OutputChannel,
    pub data: Bytes,
}

impl LogChunk {
    /// Create a chunk
    pub fn new(channel: OutputChannel, data: impl Into<Bytes>) -> Self {
        Self {
            channel,
            data: data.into(),
        }
    }
}

/// Log read settings (the log cursor)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogOptions {
    pub follow: bool,
    pub tail: Tail,
}

/// The local container runtime
#[async_trait]
pub trait Runtime: Send + Sync {
    /// Check that a container exists and can be inspected
    async fn inspect_container(&self, container_id: &str) -> Result<(), RuntimeError>;

    /// Create (but do not start) an exec inside a container
    async fn create_exec(&self, container_id: &str, spec: &ExecSpec)
        -> Result<ExecId, RuntimeError>;

    /// Start an exec with stdin/stdout attached
    async fn attach_exec(&self, exec: &ExecId, tty: bool) -> Result<ExecAttachment, RuntimeError>;

    /// Whether the exec'd process is still running
    async fn exec_running(&self, exec: &ExecId) -> Result<bool, RuntimeError>;

    /// Combined stdout and stderr log stream of a container
    async fn logs(&self, container_id: &str, options: &LogOptions)
        -> Result<LogStream, RuntimeError>;
}
