//! Graceful shutdown: one cancellation token for the listener and every
//! connection driver, plus a tracker so shutdown can wait for the drivers to
//! finish disconnecting their agents.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::task_tracker::TaskTrackerToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

/// Default time allowed for the listener and drivers after shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Stops the listener and the connection drivers, then waits for them.
#[derive(Debug, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    connections: TaskTracker,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// A clone of the cancellation token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Register a live connection. Shutdown waits until every returned
    /// guard has been dropped.
    pub fn track_connection(&self) -> TaskTrackerToken {
        self.connections.token()
    }

    /// Connections whose guard is still alive.
    pub fn open_connections(&self) -> usize {
        self.connections.len()
    }

    /// Initiate shutdown.
    pub fn shutdown(&self) {
        self.token.cancel();
        let _ = self.connections.close();
    }

    /// Whether shutdown has been initiated.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Signal shutdown, then wait up to `timeout` for `handles` and every
    /// tracked connection.
    pub async fn graceful_shutdown(&self, handles: Vec<JoinHandle<()>>, timeout: Option<Duration>) {
        let timeout = timeout.unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT);

        self.shutdown();
        info!(
            tasks = handles.len(),
            connections = self.open_connections(),
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "draining"
        );

        let drain = async {
            let _ = futures::future::join_all(handles).await;
            self.connections.wait().await;
        };
        if tokio::time::timeout(timeout, drain).await.is_err() {
            warn!(
                connections = self.open_connections(),
                "drain timed out after {timeout:?}"
            );
        }
    }
}
