//! Server and transport error types.

use std::path::PathBuf;

use thiserror::Error;

/// Startup and serving failures.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Could not bind the listening socket.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested bind address.
        addr: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Could not load the TLS certificate/key pair.
    #[error("failed to load TLS pair ({}, {}): {source}", .cert.display(), .key.display())]
    Tls {
        /// Certificate path.
        cert: PathBuf,
        /// Key path.
        key: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Could not install the metrics recorder.
    #[error("failed to install metrics recorder: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
    /// Other socket I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Connection-terminal transport failures.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The `WebSocket` layer reported an error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] axum::Error),
    /// The peer is gone.
    #[error("connection closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_error_names_address() {
        let err = ServerError::Bind {
            addr: "localhost:8100".into(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        };
        assert_eq!(err.to_string(), "failed to bind localhost:8100: in use");
    }

    #[test]
    fn tls_error_names_paths() {
        let err = ServerError::Tls {
            cert: "cert.pem".into(),
            key: "key.pem".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        let msg = err.to_string();
        assert!(msg.contains("cert.pem"));
        assert!(msg.contains("key.pem"));
        assert!(msg.contains("missing"));
    }

    #[test]
    fn closed_display() {
        assert_eq!(TransportError::Closed.to_string(), "connection closed");
    }
}
