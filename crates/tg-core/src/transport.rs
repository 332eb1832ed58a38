//! Frame transport shared by both hops
//!
//! Sessions are written against [`Duplex`], a boxed sink/stream pair of
//! [`Frame`]s, so the same bridge and engine code runs over an axum server
//! socket, a tungstenite client socket, or an in-memory pair in tests.

use std::pin::Pin;

use futures::channel::mpsc;
use futures::{future, Sink, SinkExt, Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::WebSocketStream;

use tg_protocol::Frame;

use crate::error::TransportError;

/// Outbound half of a leg
pub type FrameSink = Pin<Box<dyn Sink<Frame, Error = TransportError> + Send>>;

/// Inbound half of a leg
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, TransportError>> + Send>>;

/// One session leg
pub struct Duplex {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl Duplex {
    /// Assemble a leg from any frame sink and stream
    pub fn new<Si, St>(sink: Si, stream: St) -> Self
    where
        Si: Sink<Frame, Error = TransportError> + Send + 'static,
        St: Stream<Item = Result<Frame, TransportError>> + Send + 'static,
    {
        Self {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        }
    }

    /// Two legs wired back to back in memory
    pub fn pair(buffer: usize) -> (Duplex, Duplex) {
        let (a_tx, a_rx) = mpsc::channel::<Frame>(buffer);
        let (b_tx, b_rx) = mpsc::channel::<Frame>(buffer);

        let left = Duplex::new(
            a_tx.sink_map_err(|_| TransportError::Closed),
            b_rx.map(Ok),
        );
        let right = Duplex::new(
            b_tx.sink_map_err(|_| TransportError::Closed),
            a_rx.map(Ok),
        );
        (left, right)
    }

    /// Server side of an axum WebSocket upgrade
    pub fn from_axum(socket: axum::extract::ws::WebSocket) -> Self {
        use axum::extract::ws::Message;

        let (sink, stream) = socket.split();

        let sink = sink
            .sink_map_err(|e| TransportError::WebSocket(e.to_string()))
            .with(|frame: Frame| {
                future::ready(Ok::<_, TransportError>(match frame {
                    Frame::Text(text) => Message::Text(text),
                    Frame::Binary(data) => Message::Binary(data.to_vec()),
                    Frame::Close => Message::Close(None),
                }))
            });

        let stream = stream.filter_map(|message| {
            future::ready(match message {
                Ok(Message::Text(text)) => Some(Ok(Frame::Text(text))),
                Ok(Message::Binary(data)) => Some(Ok(Frame::Binary(data.into()))),
                Ok(Message::Close(_)) => Some(Ok(Frame::Close)),
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => None,
                Err(e) => Some(Err(TransportError::WebSocket(e.to_string()))),
            })
        });

        Duplex::new(sink, stream)
    }

    /// Client side of a tungstenite connection
    pub fn from_tungstenite<S>(socket: WebSocketStream<S>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        use tungstenite::Message;

        let (sink, stream) = socket.split();

        let sink = sink
            .sink_map_err(|e| match e {
                tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                    TransportError::Closed
                }
                other => TransportError::WebSocket(other.to_string()),
            })
            .with(|frame: Frame| {
                future::ready(Ok::<_, TransportError>(match frame {
                    Frame::Text(text) => Message::Text(text),
                    Frame::Binary(data) => Message::Binary(data.to_vec()),
                    Frame::Close => Message::Close(None),
                }))
            });

        let stream = stream.filter_map(|message| {
            future::ready(match message {
                Ok(Message::Text(text)) => Some(Ok(Frame::Text(text))),
                Ok(Message::Binary(data)) => Some(Ok(Frame::Binary(data.into()))),
                Ok(Message::Close(_)) => Some(Ok(Frame::Close)),
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => None,
                Err(tungstenite::Error::ConnectionClosed) => None,
                Err(e) => Some(Err(TransportError::WebSocket(e.to_string()))),
            })
        });

        Duplex::new(sink, stream)
    }

    /// Split into sink and stream
    pub fn split(self) -> (FrameSink, FrameStream) {
        (self.sink, self.stream)
    }

    /// Report a pre-stream failure as one `error:` frame and close
    pub async fn reject(mut self, cause: impl std::fmt::Display) {
        reject(&mut self.sink, cause).await;
    }
}

/// Send one `error: <cause>` frame on a sink and close it
pub async fn reject(sink: &mut FrameSink, cause: impl std::fmt::Display) {
    if let Err(e) = sink.send(Frame::error(cause)).await {
        tracing::debug!("Failed to deliver error frame: {}", e);
    }
    let _ = sink.close().await;
}
