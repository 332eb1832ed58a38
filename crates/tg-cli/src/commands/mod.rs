//! CLI command implementations

mod exec;
mod health;
mod logs;

pub use exec::exec_command;
pub use health::health_command;
pub use logs::logs_command;

use tokio_util::sync::CancellationToken;

/// Token cancelled on Ctrl+C
pub(crate) fn interrupt_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("Received Ctrl+C");
            token.cancel();
        }
    });
    cancel
}
