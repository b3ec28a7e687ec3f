//! Metric names recorded through the `metrics` facade.

/// Events that reached a routable address (counter).
pub const EVENTS_ROUTED_TOTAL: &str = "ebus_events_routed_total";
/// Events discarded for an unroutable destination (counter, labels: reason).
pub const EVENTS_DISCARDED_TOTAL: &str = "ebus_events_discarded_total";
/// Record writes that changed a value and were broadcast (counter).
pub const RECORD_BROADCASTS_TOTAL: &str = "ebus_record_broadcasts_total";
/// Registered agents (gauge).
pub const AGENTS_ACTIVE: &str = "ebus_agents_active";
/// Live groups (gauge).
pub const GROUPS_ACTIVE: &str = "ebus_groups_active";
