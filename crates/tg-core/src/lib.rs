//! tg-core: Core abstractions and configuration for taskgate
//!
//! This crate provides the domain types, the error taxonomy, the traits
//! through which the gateway and helper consume the orchestrator directory
//! and the container runtime, the frame transport both hops share, TLS
//! material loading and configuration structures.

pub mod config;
pub mod error;
pub mod tls;
pub mod traits;
pub mod transport;
pub mod types;

pub use error::{
    ConfigError, DirectoryError, ResolveError, RuntimeError, RuntimeStage, SessionError,
    TransportError,
};
pub use transport::Duplex;
pub use types::{
    CorrelationId, HelperEndpoint, NetworkAttachment, NodeId, Placement, ServiceInstance,
    WorkloadId, CORRELATION_HEADER,
};
