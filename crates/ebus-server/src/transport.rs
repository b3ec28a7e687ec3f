//! Frame transport seam between the connection driver and the socket.
//!
//! One transport message carries one wire frame. Any error is
//! connection-terminal; the driver never retries.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tracing::{trace, warn};

use crate::errors::TransportError;

/// Blocking read side of a connection.
#[async_trait]
pub trait FrameReader: Send {
    /// Next frame, or `None` once the peer closed the connection.
    async fn read_frame(&mut self) -> Result<Option<String>, TransportError>;
}

/// Blocking write side of a connection.
#[async_trait]
pub trait FrameWriter: Send {
    /// Write one frame. An error means the connection is gone.
    async fn write_frame(&mut self, frame: String) -> Result<(), TransportError>;

    /// Close the connection. Errors are ignored.
    async fn close(&mut self);
}

/// Read half of an axum `WebSocket`.
pub struct WsReader(pub SplitStream<WebSocket>);

/// Write half of an axum `WebSocket`.
pub struct WsWriter(pub SplitSink<WebSocket, Message>);

/// Split an upgraded socket into transport halves.
pub fn split(socket: WebSocket) -> (WsReader, WsWriter) {
    let (sink, stream) = socket.split();
    (WsReader(stream), WsWriter(sink))
}

#[async_trait]
impl FrameReader for WsReader {
    async fn read_frame(&mut self) -> Result<Option<String>, TransportError> {
        while let Some(message) = self.0.next().await {
            match message? {
                Message::Text(text) => return Ok(Some(text.to_string())),
                Message::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Ok(Some(text)),
                    Err(error) => warn!(%error, "dropping binary frame with invalid UTF-8"),
                },
                Message::Close(frame) => {
                    trace!(?frame, "peer sent close");
                    return Ok(None);
                }
                // axum answers pings itself
                Message::Ping(_) | Message::Pong(_) => {}
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl FrameWriter for WsWriter {
    async fn write_frame(&mut self, frame: String) -> Result<(), TransportError> {
        self.0.send(Message::Text(frame.into())).await?;
        Ok(())
    }

    async fn close(&mut self) {
        let _ = self.0.close().await;
    }
}
