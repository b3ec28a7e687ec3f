//! TLS termination for `wss://`.
//!
//! Accepts TCP connections, completes the rustls handshake and serves the
//! Axum router over hyper with upgrades enabled so `WebSocket` handshakes
//! work on the encrypted stream.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HyperBuilder;
use hyper_util::service::TowerToHyperService;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::TlsConfig;
use crate::errors::ServerError;

/// Time open connections get to finish after shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Build an acceptor from the PEM pair in `tls`.
pub fn load_acceptor(tls: &TlsConfig) -> Result<TlsAcceptor, ServerError> {
    let tls_error = |source: io::Error| ServerError::Tls {
        cert: tls.cert_path.clone(),
        key: tls.key_path.clone(),
        source,
    };

    let certs = load_certs(&tls.cert_path).map_err(tls_error)?;
    let key = load_key(&tls.key_path).map_err(tls_error)?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| tls_error(io::Error::new(io::ErrorKind::InvalidData, e)))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| tls_error(io::Error::new(io::ErrorKind::InvalidData, e)))?;
    // WebSocket upgrades need HTTP/1.1.
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(TlsAcceptor::from(Arc::new(config)))
}

fn load_certs(path: &Path) -> io::Result<Vec<CertificateDer<'static>>> {
    let mut reader = BufReader::new(File::open(path)?);
    let certs = rustls_pemfile::certs(&mut reader).collect::<io::Result<Vec<_>>>()?;
    if certs.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "no certificate found",
        ));
    }
    Ok(certs)
}

fn load_key(path: &Path) -> io::Result<PrivateKeyDer<'static>> {
    let mut reader = BufReader::new(File::open(path)?);
    rustls_pemfile::private_key(&mut reader)?
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "no private key found"))
}

/// Accept and serve TLS connections until `shutdown` fires, then give open
/// connections a bounded time to finish.
pub async fn serve(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    router: Router,
    shutdown: CancellationToken,
) {
    let service = TowerToHyperService::new(router);
    let mut connections = JoinSet::new();

    loop {
        let (stream, peer) = tokio::select! {
            () = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(error) => {
                    warn!(%error, "accept failed");
                    continue;
                }
            },
        };
        let acceptor = acceptor.clone();
        let service = service.clone();
        let _ = connections.spawn(async move {
            let stream = match acceptor.accept(stream).await {
                Ok(stream) => stream,
                Err(error) => {
                    debug!(%peer, %error, "TLS handshake failed");
                    return;
                }
            };
            if let Err(error) = HyperBuilder::new(TokioExecutor::new())
                .serve_connection_with_upgrades(TokioIo::new(stream), service)
                .await
            {
                debug!(%peer, %error, "connection error");
            }
        });
        // Reap finished connections so the set does not grow unbounded.
        while connections.try_join_next().is_some() {}
    }

    let drain = async { while connections.join_next().await.is_some() {} };
    if tokio::time::timeout(DRAIN_TIMEOUT, drain).await.is_err() {
        warn!(open = connections.len(), "TLS connections still open after drain timeout");
        connections.abort_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn pair(cert: &Path, key: &Path) -> TlsConfig {
        TlsConfig {
            cert_path: cert.to_path_buf(),
            key_path: key.to_path_buf(),
        }
    }

    #[test]
    fn missing_files_are_a_tls_error() {
        let cfg = pair(Path::new("/nonexistent/cert.pem"), Path::new("/nonexistent/key.pem"));
        let Err(err) = load_acceptor(&cfg) else {
            panic!("expected a TLS error");
        };
        assert!(matches!(err, ServerError::Tls { .. }));
    }

    #[test]
    fn valid_pair_builds_an_acceptor() {
        let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
        let cfg = pair(&fixtures.join("server.pem"), &fixtures.join("server.key"));
        assert!(load_acceptor(&cfg).is_ok());
    }

    #[test]
    fn certificate_in_key_slot_is_rejected() {
        let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
        let mut key = tempfile::NamedTempFile::new().unwrap();
        // A certificate file holds no private key.
        key.write_all(&std::fs::read(fixtures.join("ca.pem")).unwrap()).unwrap();
        let cfg = pair(&fixtures.join("server.pem"), key.path());
        assert!(matches!(load_acceptor(&cfg), Err(ServerError::Tls { .. })));
    }

    #[test]
    fn file_without_certificates_is_rejected() {
        let mut cert = tempfile::NamedTempFile::new().unwrap();
        writeln!(cert, "not a pem file").unwrap();
        let err = load_certs(cert.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn file_without_key_is_rejected() {
        let mut key = tempfile::NamedTempFile::new().unwrap();
        writeln!(key, "-----BEGIN NOTHING-----").unwrap();
        writeln!(key, "-----END NOTHING-----").unwrap();
        let err = load_key(key.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
