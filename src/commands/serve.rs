//! `ebus serve`: run the broker until Ctrl-C.

use std::sync::Arc;

use anyhow::{Context, Result};
use ebus_broker::Manager;
use ebus_server::metrics::install_recorder;
use ebus_server::{EbusServer, ServerConfig};
use ebus_settings::EbusSettings;
use tracing::info;

/// Start the server with `settings` and block until interrupted.
pub async fn run(settings: &EbusSettings) -> Result<()> {
    let metrics = install_recorder().context("Failed to install metrics recorder")?;
    let config = ServerConfig::from(&settings.server);
    let server = EbusServer::new(config, Arc::new(Manager::new()), Some(metrics));

    let (addr, handle) = server
        .listen()
        .await
        .with_context(|| format!("Failed to start server on {}", settings.server.bind_addr))?;
    info!(%addr, agents = server.manager().agent_count(), "ready");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutting down");

    server.shutdown().graceful_shutdown(vec![handle], None).await;
    Ok(())
}
