//! Frame model shared by both hops
//!
//! A session is a stream of WebSocket messages. Binary frames carry raw
//! process or log bytes; text frames carry either raw bytes that happened
//! to be sent as text, or one of the reserved sentinel payloads below.
//! Ping/pong are answered per hop by the WebSocket layer and never become
//! frames.

use std::fmt;

use bytes::Bytes;

/// Sent by the helper once the exec stream is attached
pub const EXEC_ATTACHED: &str = "EXEC_ATTACHED";

/// Sent by the helper exactly once when the exec'd process has ended
pub const EXEC_FINISHED: &str = "EXEC_FINISHED";

/// Prefix of the single text frame reporting a pre-stream failure
pub const ERROR_PREFIX: &str = "error: ";

/// One message on a session leg
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 payload
    Text(String),
    /// Opaque bytes
    Binary(Bytes),
    /// Orderly close requested by the peer
    Close,
}

/// Out-of-band meaning of a text frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal<'a> {
    /// `EXEC_ATTACHED`
    Attached,
    /// `EXEC_FINISHED`
    Finished,
    /// `error: <cause>`, holding the cause
    Error(&'a str),
}

impl Frame {
    /// Create a text frame
    pub fn text(text: impl Into<String>) -> Self {
        Frame::Text(text.into())
    }

    /// Create a binary frame
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Frame::Binary(data.into())
    }

    /// The attach sentinel
    pub fn attached() -> Self {
        Frame::Text(EXEC_ATTACHED.to_string())
    }

    /// The finish sentinel
    pub fn finished() -> Self {
        Frame::Text(EXEC_FINISHED.to_string())
    }

    /// An `error: <cause>` frame
    pub fn error(cause: impl fmt::Display) -> Self {
        Frame::Text(format!("{}{}", ERROR_PREFIX, cause))
    }

    /// Classify a text frame as a sentinel, if it is one
    pub fn signal(&self) -> Option<Signal<'_>> {
        let Frame::Text(text) = self else {
            return None;
        };

        match text.as_str() {
            EXEC_ATTACHED => Some(Signal::Attached),
            EXEC_FINISHED => Some(Signal::Finished),
            other => other.strip_prefix(ERROR_PREFIX).map(Signal::Error),
        }
    }

    /// Bytes carried by a data frame (text or binary)
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Frame::Text(text) => Some(text.as_bytes()),
            Frame::Binary(data) => Some(data.as_ref()),
            Frame::Close => None,
        }
    }

    /// Whether this frame ends the leg
    pub fn is_close(&self) -> bool {
        matches!(self, Frame::Close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels_are_recognised() {
        assert_eq!(Frame::attached().signal(), Some(Signal::Attached));
        assert_eq!(Frame::finished().signal(), Some(Signal::Finished));
    }

    #[test]
    fn test_error_frame_carries_cause() {
        let frame = Frame::error("workload w9 not found");
        assert_eq!(frame, Frame::text("error: workload w9 not found"));
        assert_eq!(frame.signal(), Some(Signal::Error("workload w9 not found")));
    }

    #[test]
    fn test_plain_text_is_not_a_signal() {
        assert_eq!(Frame::text("EXEC_FINISHED\n").signal(), None);
        assert_eq!(Frame::binary(&b"EXEC_FINISHED"[..]).signal(), None);
    }

    #[test]
    fn test_payload() {
        assert_eq!(Frame::text("ls\n").payload(), Some(&b"ls\n"[..]));
        assert_eq!(Frame::binary(vec![1u8, 2]).payload(), Some(&[1u8, 2][..]));
        assert_eq!(Frame::Close.payload(), None);
        assert!(Frame::Close.is_close());
    }
}
