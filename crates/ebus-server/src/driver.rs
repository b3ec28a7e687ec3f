//! Per-connection driver: one inbound and one outbound loop around an agent.
//!
//! The outbound loop sleeps on the agent's wake-up signal and drains the
//! mailbox front to back. An event is popped only after its frame was
//! written, so a write failure never loses the head event; it closes the
//! connection instead. The inbound loop decodes frames, stamps the sender
//! address and hands them to the manager. When it ends for any reason the
//! agent is disconnected, which purges its groups and stops the outbound
//! loop.

use std::sync::Arc;

use ebus_broker::{Agent, Manager, MANAGER_ADDRESS, SET_ID_TOPIC};
use ebus_core::Event;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::metrics::{
    WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL,
    WS_MALFORMED_FRAMES_TOTAL,
};
use crate::transport::{FrameReader, FrameWriter};

/// Why the inbound loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EndReason {
    PeerClosed,
    ReadError,
    WriteError,
    Shutdown,
}

impl EndReason {
    fn as_str(self) -> &'static str {
        match self {
            Self::PeerClosed => "peer_closed",
            Self::ReadError => "read_error",
            Self::WriteError => "write_error",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Run one connection to completion.
///
/// Registers a fresh agent, announces its address with `@set.id`, then runs
/// both loops until the peer goes away, a write fails or `shutdown` fires.
/// Returns the address the connection was known by.
pub async fn drive_connection<R, W>(
    manager: Arc<Manager>,
    reader: R,
    writer: W,
    shutdown: CancellationToken,
) -> String
where
    R: FrameReader,
    W: FrameWriter + 'static,
{
    let agent = Arc::new(Agent::new());
    let address = manager.add_agent(Arc::clone(&agent));
    let span = info_span!("connection", agent = %address);

    metrics::counter!(WS_CONNECTIONS_TOTAL).increment(1);
    metrics::gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    agent.mailbox().emit(
        Event::new(address.as_str(), SET_ID_TOPIC, [address.as_str()]).with_from(MANAGER_ADDRESS),
    );

    let outbound = tokio::spawn(outbound_loop(Arc::clone(&agent), writer).instrument(span.clone()));

    let reason = inbound_loop(&manager, &agent, &address, reader, &shutdown)
        .instrument(span.clone())
        .await;

    manager.disconnect(&address);
    if let Err(error) = outbound.await {
        warn!(parent: &span, %error, "outbound task failed");
    }

    metrics::counter!(WS_DISCONNECTIONS_TOTAL, "reason" => reason.as_str()).increment(1);
    metrics::gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    info!(parent: &span, reason = reason.as_str(), "connection closed");
    address
}

async fn inbound_loop<R: FrameReader>(
    manager: &Manager,
    agent: &Agent,
    address: &str,
    mut reader: R,
    shutdown: &CancellationToken,
) -> EndReason {
    info!("connection opened");
    loop {
        let frame = tokio::select! {
            () = agent.closed() => return EndReason::WriteError,
            () = shutdown.cancelled() => return EndReason::Shutdown,
            frame = reader.read_frame() => frame,
        };
        let raw = match frame {
            Ok(Some(raw)) => raw,
            Ok(None) => return EndReason::PeerClosed,
            Err(error) => {
                debug!(%error, "read failed");
                return EndReason::ReadError;
            }
        };
        match Event::server_unmarshal(&raw) {
            Ok(event) => manager.emit(event.with_from(address)),
            Err(error) => {
                metrics::counter!(WS_MALFORMED_FRAMES_TOTAL).increment(1);
                warn!(%error, len = raw.len(), "dropping malformed frame");
            }
        }
    }
}

async fn outbound_loop<W: FrameWriter>(agent: Arc<Agent>, mut writer: W) {
    'wake: while agent.wait().await {
        while let Some(event) = agent.mailbox().peek_front() {
            if event.topic.is_empty() {
                let _ = agent.mailbox().pop_front();
                continue;
            }
            if let Err(error) = writer.write_frame(event.server_marshal()).await {
                warn!(%error, topic = %event.topic, "write failed, closing connection");
                agent.close();
                break 'wake;
            }
            let _ = agent.mailbox().pop_front();
        }
    }
    writer.close().await;
}
