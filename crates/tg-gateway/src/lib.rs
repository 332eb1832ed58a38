//! tg-gateway: mTLS gateway daemon
//!
//! The gateway is the only externally reachable component. It accepts
//! mutually authenticated WebSocket sessions naming a workload, finds the
//! helper on the node running that workload and relays frames between the
//! client and the helper.
//!
//! # Architecture
//!
//! - `server`: axum router served over rustls (axum-server)
//! - `bridge`: per-session validate, resolve, dial, relay
//! - `resolver`: workload -> container + helper endpoint
//! - `dialer`: outbound WebSocket connections to helpers
//! - `directory`: orchestrator directory adapters

pub mod bridge;
pub mod dialer;
pub mod directory;
pub mod resolver;
pub mod server;
pub mod state;

pub use bridge::{relay, RelayEnd, SessionBridge};
pub use dialer::{HelperDialer, WsDialer};
pub use resolver::{EndpointResolver, Resolution};
pub use server::{router, GatewayServer};
pub use state::GatewayState;
