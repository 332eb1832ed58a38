//! tg-helper: per-node helper daemon
//!
//! The helper runs on every cluster node, listens on the private overlay
//! network and performs exec and logs sessions against the node-local
//! container runtime on behalf of the gateway.
//!
//! # Architecture
//!
//! - `server`: axum router, `/health` and the two WebSocket endpoints
//! - `engine`: exec and logs session logic over a [`tg_core::Duplex`]
//! - `runtime`: container runtime adapters (Docker via bollard)

pub mod engine;
pub mod runtime;
pub mod server;
pub mod state;

pub use engine::{ExecState, HelperEngine};
pub use server::{router, HelperServer};
pub use state::HelperState;
