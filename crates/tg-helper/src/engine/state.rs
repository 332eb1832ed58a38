//! Exec session lifecycle

use std::fmt;

use thiserror::Error;

/// A transition the lifecycle does not allow
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("illegal exec transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: ExecState,
    pub to: ExecState,
}

/// Lifecycle of one exec session.
///
/// ```text
/// Requested -> Attaching -> Attached -> Streaming -> Finished
///     \            \            \           \
///      +------------+------------+-----------+----> Error
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecState {
    /// Request accepted, container not yet inspected
    Requested,
    /// Creating and attaching the exec
    Attaching,
    /// Attached, `EXEC_ATTACHED` delivered
    Attached,
    /// Bytes flowing in both directions
    Streaming,
    /// Process exited and `EXEC_FINISHED` was sent
    Finished,
    /// Ended without a finish sentinel
    Error,
}

impl ExecState {
    /// No further transitions are possible
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecState::Finished | ExecState::Error)
    }

    /// Whether `next` is a legal successor
    pub fn can_advance_to(self, next: ExecState) -> bool {
        use ExecState::*;

        match (self, next) {
            (Requested, Attaching)
            | (Attaching, Attached)
            | (Attached, Streaming)
            | (Streaming, Finished) => true,
            (from, Error) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Move to `next`, or reject the transition
    pub fn advance(self, next: ExecState) -> Result<ExecState, InvalidTransition> {
        if self.can_advance_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for ExecState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExecState::Requested => "requested",
            ExecState::Attaching => "attaching",
            ExecState::Attached => "attached",
            ExecState::Streaming => "streaming",
            ExecState::Finished => "finished",
            ExecState::Error => "error",
        })
    }
}
