//! Helper session engine
//!
//! Turns a validated session request plus the gateway's leg into runtime
//! operations. Every session is independent; the engine itself holds no
//! per-session state.

pub mod exec;
pub mod logs;
mod state;

#[cfg(test)]
pub(crate) mod mock;

use std::sync::Arc;
use std::time::Duration;

use tg_core::config::HelperConfig;
use tg_core::error::SessionError;
use tg_core::traits::{ExecSpec, Runtime};
use tg_core::Duplex;
use tg_protocol::{split_command, SessionParams, SessionRequest};

pub use exec::ExecSession;
pub use state::{ExecState, InvalidTransition};

/// Runs exec and logs sessions against the local runtime
#[derive(Clone)]
pub struct HelperEngine {
    runtime: Arc<dyn Runtime>,
    poll_interval: Duration,
    default_command: String,
}

impl HelperEngine {
    /// Create an engine from helper configuration
    pub fn new(runtime: Arc<dyn Runtime>, config: &HelperConfig) -> Self {
        Self {
            runtime,
            poll_interval: config.poll_interval,
            default_command: config.default_command.clone(),
        }
    }

    /// Exec liveness poll period
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Argument vector for an exec request
    fn exec_spec(&self, command: Option<&str>, tty: bool) -> ExecSpec {
        let argv = match command {
            Some(command) => split_command(Some(command)),
            None => split_command(Some(&self.default_command)),
        };
        ExecSpec { argv, tty }
    }

    /// Serve one session until it ends. `request.target` is a container id.
    pub async fn run(&self, request: SessionRequest, caller: Duplex) -> Result<(), SessionError> {
        match &request.params {
            SessionParams::Exec(params) => {
                let spec = self.exec_spec(params.command.as_deref(), params.tty);
                tracing::debug!("Exec argv {:?} (tty={})", spec.argv, spec.tty);

                ExecSession::new(self.runtime.as_ref(), self.poll_interval)
                    .run(&request.target, &spec, caller)
                    .await
            }
            SessionParams::Logs(params) => {
                logs::run(self.runtime.as_ref(), &request.target, params, caller).await
            }
        }
    }
}
