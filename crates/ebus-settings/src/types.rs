//! Settings types. Every struct has `#[serde(default)]`, so a settings file
//! may name any subset of fields.

use serde::{Deserialize, Serialize};

/// Default bind address of the broker.
pub const DEFAULT_BIND_ADDR: &str = "localhost:8100";
/// Default URL clients connect to.
pub const DEFAULT_SERVER_URL: &str = "ws://localhost:8100/";
/// Default maximum inbound frame size.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Root settings object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EbusSettings {
    /// Broker server settings.
    pub server: ServerSettings,
    /// Client-side defaults.
    pub client: ClientSettings,
    /// Log output settings.
    pub logging: LoggingSettings,
}

/// Broker server settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// `host:port` to listen on.
    pub bind_addr: String,
    /// TLS termination.
    pub tls: TlsSettings,
    /// Largest accepted inbound WebSocket message, in bytes.
    pub max_frame_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            tls: TlsSettings::default(),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

/// PEM certificate and key used when TLS is enabled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TlsSettings {
    /// Serve `wss://` instead of `ws://`.
    pub enabled: bool,
    /// Certificate chain path.
    pub cert_path: String,
    /// Private key path.
    pub key_path: String,
}

impl Default for TlsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            cert_path: "cert.pem".to_string(),
            key_path: "key.pem".to_string(),
        }
    }
}

/// Client-side defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientSettings {
    /// Broker URL.
    pub server_url: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
