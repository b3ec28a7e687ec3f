//! Client error types.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Client failures.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The `WebSocket` handshake failed.
    #[error("failed to connect to {url}: {source}")]
    Connect {
        /// Target URL.
        url: String,
        /// Handshake error.
        #[source]
        source: Box<tungstenite::Error>,
    },
    /// The connection has ended.
    #[error("connection closed")]
    Closed,
}
