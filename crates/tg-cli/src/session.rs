//! Client side of exec and logs sessions
//!
//! Both loops run over a [`Duplex`] leg with caller-supplied input and
//! output handles, so the terminal plumbing stays in the commands.

use anyhow::{bail, Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use tg_core::Duplex;
use tg_protocol::{Frame, Signal};

/// Ctrl+] as delivered by a terminal in raw mode
pub const DETACH_BYTE: u8 = 0x1d;

/// How a session ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The process exited (`EXEC_FINISHED`)
    Finished,
    /// The gateway closed the connection
    Closed,
    /// The user pressed the detach key
    Detached,
    /// Cancelled locally (Ctrl+C outside raw mode)
    Interrupted,
}

/// Terminal raw mode, restored on drop
pub struct RawMode(());

impl RawMode {
    pub fn enable() -> Result<Self> {
        crossterm::terminal::enable_raw_mode().context("Failed to put terminal in raw mode")?;
        Ok(Self(()))
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(e) = crossterm::terminal::disable_raw_mode() {
            tracing::warn!("Failed to restore terminal: {}", e);
        }
    }
}

/// Split a chunk of keyboard input at the detach key.
///
/// Returns the bytes to forward and whether the key was pressed.
pub fn split_detach(chunk: &[u8]) -> (&[u8], bool) {
    match chunk.iter().position(|&b| b == DETACH_BYTE) {
        Some(at) => (&chunk[..at], true),
        None => (chunk, false),
    }
}

/// Drive an exec session.
///
/// Input is forwarded as binary frames; output frames are written as they
/// arrive. `EXEC_ATTACHED` is swallowed, `EXEC_FINISHED` ends the session
/// and an `error:` frame becomes the returned error. When `detach_key` is
/// set, Ctrl+] in the input ends the session locally. End of input stops
/// forwarding but keeps the session open for remaining output.
pub async fn run_exec<R, W>(
    session: Duplex,
    mut input: R,
    mut output: W,
    detach_key: bool,
    cancel: CancellationToken,
) -> Result<SessionEnd>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (mut sink, mut stream) = session.split();
    let mut buf = vec![0u8; 4096];
    let mut input_open = true;

    let end = loop {
        tokio::select! {
            _ = cancel.cancelled() => break SessionEnd::Interrupted,

            read = input.read(&mut buf), if input_open => match read {
                Ok(0) => {
                    tracing::debug!("Input closed");
                    input_open = false;
                }
                Ok(n) => {
                    let (data, detach) = if detach_key {
                        split_detach(&buf[..n])
                    } else {
                        (&buf[..n], false)
                    };
                    if !data.is_empty() {
                        sink.send(Frame::binary(data.to_vec()))
                            .await
                            .context("Failed to send input")?;
                    }
                    if detach {
                        break SessionEnd::Detached;
                    }
                }
                Err(e) => {
                    tracing::debug!("Input read failed: {}", e);
                    input_open = false;
                }
            },

            frame = stream.next() => match frame {
                None | Some(Ok(Frame::Close)) => break SessionEnd::Closed,
                Some(Err(e)) => return Err(e).context("Session connection failed"),
                Some(Ok(frame)) => match frame.signal() {
                    Some(Signal::Attached) => tracing::debug!("Exec attached"),
                    Some(Signal::Finished) => break SessionEnd::Finished,
                    Some(Signal::Error(cause)) => {
                        let cause = cause.to_string();
                        let _ = sink.close().await;
                        bail!(cause);
                    }
                    None => write_payload(&mut output, &frame).await?,
                },
            },
        }
    };

    let _ = sink.close().await;
    Ok(end)
}

/// Drive a logs session, writing every frame to `output` until close.
pub async fn stream_logs<W>(
    session: Duplex,
    mut output: W,
    cancel: CancellationToken,
) -> Result<SessionEnd>
where
    W: AsyncWrite + Unpin,
{
    let (mut sink, mut stream) = session.split();

    let end = loop {
        tokio::select! {
            _ = cancel.cancelled() => break SessionEnd::Interrupted,

            frame = stream.next() => match frame {
                None | Some(Ok(Frame::Close)) => break SessionEnd::Closed,
                Some(Err(e)) => return Err(e).context("Session connection failed"),
                Some(Ok(frame)) => {
                    if let Some(Signal::Error(cause)) = frame.signal() {
                        bail!(cause.to_string());
                    }
                    write_payload(&mut output, &frame).await?;
                }
            },
        }
    };

    let _ = sink.close().await;
    Ok(end)
}

async fn write_payload<W>(output: &mut W, frame: &Frame) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if let Some(payload) = frame.payload() {
        output.write_all(payload).await.context("Failed to write output")?;
        output.flush().await.context("Failed to write output")?;
    }
    Ok(())
}
