//! `@status`: operational introspection.

use ebus_core::address::service_address;
use ebus_core::Event;
use tracing::debug;

use super::STATUS;
use crate::manager::Router;

/// Topic listing registered agent addresses.
pub const AGENTS: &str = "agents";
/// Topic reporting the routed-event counter.
pub const EVENT_COUNT: &str = "event_count";

pub(super) fn handle(event: Event, router: &mut Router<'_>) {
    let data = match event.topic.as_str() {
        AGENTS => router.agents(),
        EVENT_COUNT => vec![router.event_count().to_string()],
        topic => {
            debug!(from = %event.from, %topic, "unknown status topic");
            return;
        }
    };
    router.emit(event.reply(service_address(STATUS), event.topic.as_str(), data));
}
