//! Protocol error types

use thiserror::Error;

/// Errors raised while decoding a session request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The hop's identifier parameter is absent or blank
    #[error("missing identifier")]
    MissingIdentifier { field: &'static str },

    /// A parameter is present but cannot be interpreted
    #[error("invalid {name}: {value:?}")]
    InvalidParameter { name: &'static str, value: String },

    /// Path segment does not name a session kind
    #[error("unknown session kind: {0}")]
    UnknownKind(String),
}
