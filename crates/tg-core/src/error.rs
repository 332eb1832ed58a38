//! Core error types for taskgate

use std::fmt;
use std::path::PathBuf;

use tg_protocol::ProtocolError;
use thiserror::Error;

use crate::types::{NodeId, WorkloadId};

/// Why a session ended early.
///
/// Every variant is terminal for its session; nothing is retried. Before
/// streaming begins the display form becomes the `error: <cause>` frame.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Missing or invalid identifier or parameters
    #[error("{0}")]
    BadRequest(#[from] ProtocolError),

    /// Workload, placement or helper could not be found
    #[error("resolve: {0}")]
    Resolution(#[from] ResolveError),

    /// Helper unreachable
    #[error("dial helper: {0}")]
    Dial(String),

    /// Container runtime refused an operation
    #[error("{stage}: {source}")]
    Runtime {
        stage: RuntimeStage,
        #[source]
        source: RuntimeError,
    },

    /// Read or write failure on either leg
    #[error("stream: {0}")]
    Stream(#[from] TransportError),
}

impl SessionError {
    /// Wrap a runtime failure with the step that produced it
    pub fn runtime(stage: RuntimeStage, source: RuntimeError) -> Self {
        SessionError::Runtime { stage, source }
    }
}

/// Runtime operation a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeStage {
    Inspect,
    CreateExec,
    AttachExec,
    Logs,
}

impl fmt::Display for RuntimeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RuntimeStage::Inspect => "inspect",
            RuntimeStage::CreateExec => "create exec",
            RuntimeStage::AttachExec => "attach exec",
            RuntimeStage::Logs => "logs",
        })
    }
}

/// Endpoint resolution failures
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Directory does not know the workload
    #[error("workload {0} not found")]
    NotFound(WorkloadId),

    /// Workload exists but has no live container
    #[error("workload {0} has no running container")]
    NoPlacement(WorkloadId),

    /// No helper instance reachable on the workload's node
    #[error("no running {service} instance on node {node} attached to {network}")]
    NoHelper {
        service: String,
        node: NodeId,
        network: String,
    },

    /// Directory query failed
    #[error("directory: {0}")]
    Directory(DirectoryError),
}

/// Errors from the orchestrator directory adapter
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// Object does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Directory unreachable or returned garbage
    #[error("{0}")]
    Unavailable(String),
}

/// Errors from the container runtime adapter
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Container or exec does not exist
    #[error("no such object: {0}")]
    NotFound(String),

    /// Runtime API call failed
    #[error("{0}")]
    Api(String),

    /// Attach or log stream failed mid-read
    #[error("stream error: {0}")]
    Stream(String),
}

/// Errors on a frame transport leg
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Peer went away
    #[error("connection closed")]
    Closed,

    /// WebSocket protocol or I/O failure
    #[error("websocket: {0}")]
    WebSocket(String),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Config file unreadable
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Listen address is neither `host:port` nor `:port`
    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),
}
