//! # ebus-server
//!
//! Axum HTTP + `WebSocket` front end for the broker.
//!
//! - `GET /`: `WebSocket` upgrade; each socket runs the connection driver
//! - `GET /health`: liveness plus agent and event counters
//! - `GET /metrics`: Prometheus exposition
//! - Optional TLS termination via rustls and hyper
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod driver;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod tls;
pub mod transport;

pub use config::{ServerConfig, TlsConfig};
pub use driver::drive_connection;
pub use errors::{ServerError, TransportError};
pub use server::EbusServer;
pub use shutdown::ShutdownCoordinator;
pub use transport::{FrameReader, FrameWriter};
