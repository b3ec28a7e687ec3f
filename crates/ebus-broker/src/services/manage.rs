//! `@manage`: lifecycle notifications from the connection driver.

use ebus_core::Event;
use tracing::debug;

use crate::manager::{Router, DISCONNECTED_TOPIC};

pub(super) fn handle(event: Event, router: &mut Router<'_>) {
    if event.topic != DISCONNECTED_TOPIC {
        debug!(from = %event.from, topic = %event.topic, "unknown manage topic");
        return;
    }
    let groups = router
        .agent(&event.from)
        .map(|agent| agent.joined_groups())
        .unwrap_or_default();
    for group in &groups {
        router.leave(group, &event.from);
    }
    debug!(agent = %event.from, groups = groups.len(), "purged group memberships");
}
