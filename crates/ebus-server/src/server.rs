//! `EbusServer`: Axum HTTP + `WebSocket` server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use ebus_broker::Manager;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::driver::drive_connection;
use crate::errors::ServerError;
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;
use crate::{tls, transport};

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Routing state.
    pub manager: Arc<Manager>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
    /// When the server started.
    pub start_time: Instant,
    /// Max inbound message size.
    pub max_frame_bytes: usize,
}

/// The broker server.
pub struct EbusServer {
    config: ServerConfig,
    manager: Arc<Manager>,
    metrics: Option<PrometheusHandle>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
}

impl EbusServer {
    /// Create a server around `manager`. Pass a handle from
    /// [`crate::metrics::install_recorder`] to enable `/metrics`.
    pub fn new(config: ServerConfig, manager: Arc<Manager>, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            config,
            manager,
            metrics,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            manager: Arc::clone(&self.manager),
            shutdown: Arc::clone(&self.shutdown),
            metrics: self.metrics.clone(),
            start_time: self.start_time,
            max_frame_bytes: self.config.max_frame_bytes,
        };

        Router::new()
            .route("/", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state)
    }

    /// Bind the listener and start serving in a background task.
    ///
    /// Returns the bound address and the serving task, which completes after
    /// [`ShutdownCoordinator::shutdown`].
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.config.bind_addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        let router = self.router();
        let token = self.shutdown.token();

        let handle = match &self.config.tls {
            None => {
                info!(addr = %local_addr, "ebus server listening (ws)");
                tokio::spawn(async move {
                    let serve = axum::serve(listener, router)
                        .with_graceful_shutdown(async move { token.cancelled().await });
                    if let Err(error) = serve.await {
                        error!(%error, "server terminated");
                    }
                })
            }
            Some(tls_config) => {
                let acceptor = tls::load_acceptor(tls_config)?;
                info!(addr = %local_addr, "ebus server listening (wss)");
                tokio::spawn(tls::serve(listener, acceptor, router, token))
            }
        };

        Ok((local_addr, handle))
    }

    /// The routing state.
    pub fn manager(&self) -> &Arc<Manager> {
        &self.manager
    }

    /// The shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }
}

/// GET /: `WebSocket` upgrade.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.max_message_size(state.max_frame_bytes)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let _guard = state.shutdown.track_connection();
    let (reader, writer) = transport::split(socket);
    let _ = drive_connection(state.manager, reader, writer, state.shutdown.token()).await;
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        &state.manager,
        state.shutdown.is_shutting_down(),
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => crate::metrics::render(handle).into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use ebus_core::Event;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::ServiceExt;

    use crate::config::TlsConfig;

    fn make_server() -> EbusServer {
        EbusServer::new(ServerConfig::default(), Arc::new(Manager::new()), None)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null))
    }

    #[tokio::test]
    async fn health_reports_counters() {
        let server = make_server();
        server.manager().emit(Event::new("@status", "agents", Vec::<String>::new()));

        let (status, body) = get_json(server.router(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["agents"], 0);
        // The reply to an empty sender is unroutable and does not count.
        assert_eq!(body["event_count"], 1);
        assert!(body["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn metrics_without_recorder_is_not_found() {
        let server = make_server();
        let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_with_recorder_renders_text() {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let server = EbusServer::new(ServerConfig::default(), Arc::new(Manager::new()), Some(handle));
        let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn plain_get_on_root_is_rejected() {
        let server = make_server();
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let server = make_server();
        let (status, _) = get_json(server.router(), "/nonexistent").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listen_binds_ephemeral_port_and_stops_on_shutdown() {
        let server = make_server();
        let (addr, handle) = server.listen().await.unwrap();
        assert_ne!(addr.port(), 0);

        server.shutdown().shutdown();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn missing_tls_pair_is_a_startup_error() {
        let config = ServerConfig {
            tls: Some(TlsConfig {
                cert_path: "/nonexistent/cert.pem".into(),
                key_path: "/nonexistent/key.pem".into(),
            }),
            ..ServerConfig::default()
        };
        let server = EbusServer::new(config, Arc::new(Manager::new()), None);
        let err = server.listen().await.unwrap_err();
        assert!(matches!(err, ServerError::Tls { .. }));
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let config = ServerConfig {
            bind_addr: "definitely-not-a-host.invalid:1".into(),
            ..ServerConfig::default()
        };
        let server = EbusServer::new(config, Arc::new(Manager::new()), None);
        let err = server.listen().await.unwrap_err();
        assert!(matches!(err, ServerError::Bind { .. }));
    }
}
