//! Interactive exec sessions
//!
//! One session runs one command inside one container. After attaching, two
//! pumps and a liveness poll race each other:
//!
//! - output pump: process output -> caller, as binary frames
//! - input pump: caller frames -> process stdin
//! - exit poll: asks the runtime every `poll_interval` whether the process
//!   is still running
//!
//! Whichever finishes first decides how the session ends. Losing futures are
//! dropped, which is how the others are cancelled.

use std::time::Duration;

use futures::{FutureExt, SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::time::{Instant, MissedTickBehavior};

use tg_core::error::{RuntimeError, RuntimeStage, SessionError, TransportError};
use tg_core::traits::{ExecAttachment, ExecId, ExecSpec, InputSink, OutputStream, Runtime};
use tg_core::transport::{self, FrameSink, FrameStream};
use tg_core::Duplex;
use tg_protocol::Frame;

use super::state::ExecState;

/// Why streaming stopped
#[derive(Debug)]
enum StreamEnd {
    /// Process output reached EOF
    OutputClosed,
    /// Reading process output failed
    OutputFailed(RuntimeError),
    /// The exit poll saw the process stop
    Exited,
    /// Caller hung up, or output could not be delivered to it
    CallerGone(TransportError),
}

/// A single exec session
pub struct ExecSession<'a> {
    runtime: &'a dyn Runtime,
    poll_interval: Duration,
    state: ExecState,
}

impl<'a> ExecSession<'a> {
    /// Create a session in the `Requested` state
    pub fn new(runtime: &'a dyn Runtime, poll_interval: Duration) -> Self {
        Self {
            runtime,
            poll_interval,
            state: ExecState::Requested,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ExecState {
        self.state
    }

    fn advance(&mut self, next: ExecState) {
        match self.state.advance(next) {
            Ok(state) => {
                tracing::trace!("exec {} -> {}", self.state, state);
                self.state = state;
            }
            Err(e) => tracing::error!("{}", e),
        }
    }

    /// Run the session to completion.
    ///
    /// Returns `Ok` only when the process finished and `EXEC_FINISHED` was
    /// delivered. Pre-stream failures are reported to the caller as one
    /// `error:` frame before returning.
    pub async fn run(
        &mut self,
        container_id: &str,
        spec: &ExecSpec,
        caller: Duplex,
    ) -> Result<(), SessionError> {
        let (mut sink, mut stream) = caller.split();

        let (exec, attachment) = match self.attach(container_id, spec).await {
            Ok(attached) => attached,
            Err(e) => {
                self.advance(ExecState::Error);
                transport::reject(&mut sink, &e).await;
                return Err(e);
            }
        };

        if let Err(e) = sink.send(Frame::attached()).await {
            self.advance(ExecState::Error);
            return Err(e.into());
        }
        self.advance(ExecState::Attached);

        tracing::info!("Exec {} attached in container {}", exec, container_id);
        self.advance(ExecState::Streaming);

        let end = self.stream(&exec, attachment, &mut sink, &mut stream).await;
        let result = match end {
            Ok(()) => match sink.send(Frame::finished()).await {
                Ok(()) => {
                    self.advance(ExecState::Finished);
                    tracing::info!("Exec {} finished", exec);
                    Ok(())
                }
                Err(e) => {
                    self.advance(ExecState::Error);
                    Err(e.into())
                }
            },
            Err(e) => {
                self.advance(ExecState::Error);
                tracing::info!("Exec {} ended early: {}", exec, e);
                Err(e)
            }
        };

        let _ = sink.close().await;
        result
    }

    /// Inspect, create and attach. Moves through `Requested` and `Attaching`.
    async fn attach(
        &mut self,
        container_id: &str,
        spec: &ExecSpec,
    ) -> Result<(ExecId, ExecAttachment), SessionError> {
        self.runtime
            .inspect_container(container_id)
            .await
            .map_err(|e| SessionError::runtime(RuntimeStage::Inspect, e))?;

        self.advance(ExecState::Attaching);

        let exec = self
            .runtime
            .create_exec(container_id, spec)
            .await
            .map_err(|e| SessionError::runtime(RuntimeStage::CreateExec, e))?;

        let attachment = self
            .runtime
            .attach_exec(&exec, spec.tty)
            .await
            .map_err(|e| SessionError::runtime(RuntimeStage::AttachExec, e))?;

        Ok((exec, attachment))
    }

    /// Pump bytes until the process ends (`Ok`) or the session breaks.
    ///
    /// The attachment is dropped before this returns, so the finish sentinel
    /// is only sent once the runtime handle is released.
    async fn stream(
        &self,
        exec: &ExecId,
        attachment: ExecAttachment,
        sink: &mut FrameSink,
        stream: &mut FrameStream,
    ) -> Result<(), SessionError> {
        let ExecAttachment {
            mut output,
            mut input,
        } = attachment;

        let end = tokio::select! {
            end = pump_output(&mut output, sink) => end,
            e = pump_input(stream, &mut input) => StreamEnd::CallerGone(e),
            () = watch_exit(self.runtime, exec, self.poll_interval) => StreamEnd::Exited,
        };
        drop(input);

        let result = match end {
            StreamEnd::OutputClosed => Ok(()),
            StreamEnd::Exited => {
                tracing::debug!("Exec {} exited, flushing buffered output", exec);
                flush_ready(&mut output, sink).await
            }
            StreamEnd::OutputFailed(e) => {
                tracing::warn!("Exec {} output failed: {}", exec, e);
                match self.runtime.exec_running(exec).await {
                    Ok(false) => Ok(()),
                    _ => Err(SessionError::runtime(RuntimeStage::AttachExec, e)),
                }
            }
            StreamEnd::CallerGone(e) => Err(e.into()),
        };
        drop(output);

        result
    }
}

/// Forward process output until EOF, a read error, or a dead caller
async fn pump_output(output: &mut OutputStream, sink: &mut FrameSink) -> StreamEnd {
    while let Some(chunk) = output.next().await {
        match chunk {
            Ok(data) if data.is_empty() => continue,
            Ok(data) => {
                if let Err(e) = sink.send(Frame::Binary(data)).await {
                    return StreamEnd::CallerGone(e);
                }
            }
            Err(e) => return StreamEnd::OutputFailed(e),
        }
    }
    StreamEnd::OutputClosed
}

/// Feed caller frames to the process until the caller goes away.
///
/// A process that stops reading stdin does not end the session; later
/// caller input is read and discarded.
async fn pump_input(stream: &mut FrameStream, input: &mut InputSink) -> TransportError {
    let mut writable = true;

    while let Some(frame) = stream.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => return e,
        };
        let Some(payload) = frame.payload() else {
            return TransportError::Closed;
        };

        if !writable || payload.is_empty() {
            continue;
        }
        let written = match input.write_all(payload).await {
            Ok(()) => input.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            tracing::debug!("Process stdin closed: {}", e);
            writable = false;
        }
    }

    TransportError::Closed
}

/// Resolve once the runtime reports the exec as no longer running
async fn watch_exit(runtime: &dyn Runtime, exec: &ExecId, period: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match runtime.exec_running(exec).await {
            Ok(false) => return,
            Ok(true) => {}
            Err(e) => tracing::debug!("Exec {} status poll failed: {}", exec, e),
        }
    }
}

/// Deliver output the runtime already produced but that was not yet read
async fn flush_ready(output: &mut OutputStream, sink: &mut FrameSink) -> Result<(), SessionError> {
    while let Some(Some(chunk)) = output.next().now_or_never() {
        match chunk {
            Ok(data) if data.is_empty() => {}
            Ok(data) => sink.send(Frame::Binary(data)).await?,
            Err(_) => break,
        }
    }
    Ok(())
}
