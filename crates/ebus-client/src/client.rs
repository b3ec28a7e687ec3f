//! Broker connection handle.

use std::fmt;
use std::sync::Arc;

use ebus_core::Event;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::ClientError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Receive callback, invoked once per event on the reader task.
pub type EventCallback = Arc<dyn Fn(Event) + Send + Sync>;

const MANAGER: &str = "@manager";
const SET_ID: &str = "@set.id";

/// A live connection to the broker.
///
/// Dropping the handle closes the connection.
pub struct Client {
    outbound: mpsc::UnboundedSender<Event>,
    address: watch::Receiver<Option<String>>,
    closed: CancellationToken,
}

impl Client {
    /// Connect to `url` and start the reader and writer tasks.
    ///
    /// Fails if the handshake fails; there is no half-built client.
    pub async fn connect<F>(url: &str, on_event: F) -> Result<Self, ClientError>
    where
        F: Fn(Event) + Send + Sync + 'static,
    {
        let (ws, _) = connect_async(url).await.map_err(|source| ClientError::Connect {
            url: url.to_string(),
            source: Box::new(source),
        })?;
        debug!(%url, "connected");
        Ok(Self::start(ws, Arc::new(on_event)))
    }

    /// Connect and deliver received events through a channel instead of a
    /// callback.
    pub async fn connect_with_channel(
        url: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Event>), ClientError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = Self::connect(url, move |event| {
            let _ = tx.send(event);
        })
        .await?;
        Ok((client, rx))
    }

    fn start(ws: WsStream, on_event: EventCallback) -> Self {
        let (sink, stream) = ws.split();
        let (outbound, queue) = mpsc::unbounded_channel();
        let (address_tx, address) = watch::channel(None);
        let closed = CancellationToken::new();

        drop(tokio::spawn(write_loop(sink, queue, closed.clone())));
        drop(tokio::spawn(read_loop(stream, on_event, address_tx, closed.clone())));

        Self {
            outbound,
            address,
            closed,
        }
    }

    /// Queue `event` for sending. Never blocks; events go out in call order.
    pub fn emit(&self, event: Event) -> Result<(), ClientError> {
        if self.closed.is_cancelled() {
            return Err(ClientError::Closed);
        }
        self.outbound.send(event).map_err(|_| ClientError::Closed)
    }

    /// Address assigned by the broker, once announced.
    pub fn address(&self) -> Option<String> {
        self.address.borrow().clone()
    }

    /// Wait until the broker has announced this connection's address.
    pub async fn wait_address(&self) -> Result<String, ClientError> {
        let mut rx = self.address.clone();
        let current = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| ClientError::Closed)?;
        current.clone().ok_or(ClientError::Closed)
    }

    /// Resolves when the connection has ended.
    pub async fn closed(&self) {
        self.closed.cancelled().await;
    }

    /// Whether the connection has ended.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Close the connection.
    pub fn close(&self) {
        self.closed.cancel();
    }

    /// Send to `to` with `topic` and `data`.
    pub fn send<I, S>(&self, to: &str, topic: &str, data: I) -> Result<(), ClientError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.emit(Event::new(to, topic, data))
    }

    /// Join `group`.
    pub fn join(&self, group: &str) -> Result<(), ClientError> {
        self.send("@join", group, NO_DATA)
    }

    /// Leave `group`.
    pub fn leave(&self, group: &str) -> Result<(), ClientError> {
        self.send("@leave", group, NO_DATA)
    }

    /// Send `data` to every member of `group`. The group id doubles as the
    /// topic members receive.
    pub fn broadcast<I, S>(&self, group: &str, data: I) -> Result<(), ClientError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send("@boardcast", group, data)
    }

    /// Store `value` under `key`.
    pub fn record_set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.send("@record", "set", [key, value])
    }

    /// Ask for the value of `key`; the reply arrives as a `get` event.
    pub fn record_get(&self, key: &str) -> Result<(), ClientError> {
        self.send("@record", "get", [key])
    }

    /// Ask for `key` and subscribe to its changes.
    pub fn record_sync(&self, key: &str) -> Result<(), ClientError> {
        self.send("@record", "sync", [key])
    }

    /// Ask for the list of connected agents.
    pub fn status_agents(&self) -> Result<(), ClientError> {
        self.send("@status", "agents", NO_DATA)
    }

    /// Ask for the broker's event counter.
    pub fn status_event_count(&self) -> Result<(), ClientError> {
        self.send("@status", "event_count", NO_DATA)
    }
}

const NO_DATA: [&str; 0] = [];

impl Drop for Client {
    fn drop(&mut self) {
        self.closed.cancel();
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("address", &self.address())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

async fn write_loop(
    mut sink: futures::stream::SplitSink<WsStream, Message>,
    mut queue: mpsc::UnboundedReceiver<Event>,
    closed: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            () = closed.cancelled() => {
                // Events emitted before close still go out.
                while let Ok(event) = queue.try_recv() {
                    if send_event(&mut sink, &event).await.is_err() {
                        break;
                    }
                }
                break;
            }
            event = queue.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        if send_event(&mut sink, &event).await.is_err() {
            break;
        }
    }
    closed.cancel();
    let _ = sink.close().await;
}

async fn send_event(
    sink: &mut futures::stream::SplitSink<WsStream, Message>,
    event: &Event,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let result = sink.send(Message::Text(event.client_marshal().into())).await;
    if let Err(error) = &result {
        warn!(%error, "write failed, closing");
    }
    result
}

async fn read_loop(
    mut stream: futures::stream::SplitStream<WsStream>,
    on_event: EventCallback,
    address: watch::Sender<Option<String>>,
    closed: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            () = closed.cancelled() => break,
            message = stream.next() => message,
        };
        let text = match message {
            Some(Ok(Message::Text(text))) => text.to_string(),
            Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => text,
                Err(error) => {
                    warn!(%error, "dropping binary frame with invalid UTF-8");
                    continue;
                }
            },
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => continue,
            Some(Err(error)) => {
                debug!(%error, "read failed");
                break;
            }
        };
        match Event::client_unmarshal(&text) {
            Ok(event) => {
                if event.from == MANAGER && event.topic == SET_ID {
                    if let Some(assigned) = event.data.first() {
                        let _ = address.send_replace(Some(assigned.clone()));
                    }
                }
                on_event(event);
            }
            Err(error) => warn!(%error, "dropping malformed frame"),
        }
    }
    closed.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_to_nothing_fails() {
        // Port 1 is reserved and never has a WebSocket server.
        let err = Client::connect("ws://127.0.0.1:1/", |_| {}).await.unwrap_err();
        assert!(matches!(err, ClientError::Connect { .. }));
    }

    #[tokio::test]
    async fn invalid_url_fails() {
        let err = Client::connect("not a url", |_| {}).await.unwrap_err();
        assert!(matches!(err, ClientError::Connect { .. }));
    }
}
