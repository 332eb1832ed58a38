//! tg-protocol: Wire vocabulary for taskgate sessions
//!
//! This crate defines what travels over the two WebSocket hops
//! (client to gateway, gateway to helper): the frame model with its
//! reserved sentinel payloads, and the session request carried in the
//! upgrade query string.

pub mod command;
pub mod error;
pub mod frame;
pub mod request;

pub use command::{split_command, DEFAULT_SHELL};
pub use error::ProtocolError;
pub use frame::{Frame, Signal, ERROR_PREFIX, EXEC_ATTACHED, EXEC_FINISHED};
pub use request::{
    is_valid_identifier, parse_flag, ExecParams, IdentifierField, LogsParams, SessionKind,
    SessionParams, SessionQuery, SessionRequest, Tail, DEFAULT_TAIL,
};
