//! Server configuration.

use std::path::PathBuf;

use ebus_settings::ServerSettings;
use serde::{Deserialize, Serialize};

/// Configuration for the broker server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// `host:port` to bind. Port `0` picks a free port.
    pub bind_addr: String,
    /// Serve over TLS when set.
    pub tls: Option<TlsConfig>,
    /// Max inbound `WebSocket` message size in bytes.
    pub max_frame_bytes: usize,
}

/// PEM certificate chain and private key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Certificate chain file.
    pub cert_path: PathBuf,
    /// Private key file.
    pub key_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:0".into(),
            tls: None,
            max_frame_bytes: 1024 * 1024, // 1 MiB
        }
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            bind_addr: settings.bind_addr.clone(),
            tls: settings.tls.enabled.then(|| TlsConfig {
                cert_path: PathBuf::from(&settings.tls.cert_path),
                key_path: PathBuf::from(&settings.tls.key_path),
            }),
            max_frame_bytes: settings.max_frame_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_binds_ephemeral_loopback() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.bind_addr, "127.0.0.1:0");
        assert!(cfg.tls.is_none());
        assert_eq!(cfg.max_frame_bytes, 1024 * 1024);
    }

    #[test]
    fn from_settings_without_tls() {
        let settings = ServerSettings::default();
        let cfg = ServerConfig::from(&settings);
        assert_eq!(cfg.bind_addr, "localhost:8100");
        assert!(cfg.tls.is_none());
        assert_eq!(cfg.max_frame_bytes, settings.max_frame_bytes);
    }

    #[test]
    fn from_settings_with_tls() {
        let mut settings = ServerSettings::default();
        settings.tls.enabled = true;
        settings.tls.cert_path = "/etc/ebus/cert.pem".into();
        let cfg = ServerConfig::from(&settings);
        let tls = cfg.tls.unwrap();
        assert_eq!(tls.cert_path, PathBuf::from("/etc/ebus/cert.pem"));
        assert_eq!(tls.key_path, PathBuf::from("key.pem"));
    }

    #[test]
    fn serde_roundtrip() {
        let cfg = ServerConfig {
            tls: Some(TlsConfig {
                cert_path: "c.pem".into(),
                key_path: "k.pem".into(),
            }),
            ..ServerConfig::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ServerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
