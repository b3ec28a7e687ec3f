//! Prometheus metrics recorder and `/metrics` rendering.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

use crate::errors::ServerError;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the handle used to render `/metrics`. Call once at startup,
/// before any metrics are recorded.
pub fn install_recorder() -> Result<PrometheusHandle, ServerError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

/// `WebSocket` connections accepted (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ebus_ws_connections_total";
/// `WebSocket` connections ended (counter, labels: reason).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ebus_ws_disconnections_total";
/// Open `WebSocket` connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ebus_ws_connections_active";
/// Inbound frames that failed to decode (counter).
pub const WS_MALFORMED_FRAMES_TOTAL: &str = "ebus_ws_malformed_frames_total";
