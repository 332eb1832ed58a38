//! Log streaming sessions
//!
//! The runtime hands back demultiplexed chunks; each chunk becomes one
//! binary frame in arrival order. There is no finish sentinel: the leg is
//! closed when the runtime stream ends. In follow mode that only happens
//! when the caller hangs up.

use futures::{SinkExt, StreamExt};

use tg_core::error::{RuntimeStage, SessionError, TransportError};
use tg_core::traits::{LogOptions, LogStream, Runtime};
use tg_core::transport::{self, FrameSink, FrameStream};
use tg_core::Duplex;
use tg_protocol::{Frame, LogsParams};

/// Stream a container's logs to the caller
pub async fn run(
    runtime: &dyn Runtime,
    container_id: &str,
    params: &LogsParams,
    caller: Duplex,
) -> Result<(), SessionError> {
    let (mut sink, mut stream) = caller.split();

    let options = LogOptions {
        follow: params.follow,
        tail: params.tail,
    };
    let mut logs = match runtime.logs(container_id, &options).await {
        Ok(logs) => logs,
        Err(e) => {
            let err = SessionError::runtime(RuntimeStage::Logs, e);
            transport::reject(&mut sink, &err).await;
            return Err(err);
        }
    };

    tracing::info!(
        "Streaming logs of {} (follow={}, tail={})",
        container_id,
        options.follow,
        options.tail
    );

    let result = tokio::select! {
        result = forward(&mut logs, &mut sink) => result,
        e = caller_gone(&mut stream) => Err(e.into()),
    };
    drop(logs);

    let _ = sink.close().await;
    result
}

async fn forward(logs: &mut LogStream, sink: &mut FrameSink) -> Result<(), SessionError> {
    while let Some(chunk) = logs.next().await {
        let chunk = chunk.map_err(|e| SessionError::runtime(RuntimeStage::Logs, e))?;
        if chunk.data.is_empty() {
            continue;
        }
        tracing::trace!("{:?}: {} bytes", chunk.channel, chunk.data.len());
        sink.send(Frame::Binary(chunk.data)).await?;
    }

    tracing::debug!("Log stream ended");
    Ok(())
}

/// Resolves when the caller closes or the leg breaks; data is ignored
async fn caller_gone(stream: &mut FrameStream) -> TransportError {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Frame::Close) => break,
            Ok(_) => {}
            Err(e) => return e,
        }
    }
    TransportError::Closed
}
