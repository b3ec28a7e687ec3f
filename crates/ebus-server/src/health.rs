//! `/health` endpoint.

use std::time::Instant;

use ebus_broker::Manager;
use serde::Serialize;

/// Snapshot of broker liveness and routing counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    /// `"ok"`, or `"draining"` once shutdown has started.
    pub status: &'static str,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Registered agents.
    pub agents: usize,
    /// Live groups, including record subscription groups.
    pub groups: usize,
    /// Stored record keys.
    pub records: usize,
    /// Same value `@status/event_count` reports.
    pub event_count: u64,
}

/// Read the counters off `manager`.
pub fn health_check(start_time: Instant, manager: &Manager, draining: bool) -> HealthResponse {
    HealthResponse {
        status: if draining { "draining" } else { "ok" },
        uptime_secs: start_time.elapsed().as_secs(),
        agents: manager.agent_count(),
        groups: manager.groups().len(),
        records: manager.records().len(),
        event_count: manager.event_count(),
    }
}
