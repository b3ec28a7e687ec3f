//! `@join`, `@leave` and `@boardcast`. The event topic names the group.

use ebus_core::address::service_address;
use ebus_core::Event;
use tracing::debug;

use super::BOARDCAST;
use crate::manager::Router;

pub(super) fn join(event: Event, router: &mut Router<'_>) {
    let _ = router.join(&event.topic, &event.from);
}

pub(super) fn leave(event: Event, router: &mut Router<'_>) {
    router.leave(&event.topic, &event.from);
}

/// Re-emit one copy per current member, sent from `@boardcast`.
pub(super) fn boardcast(event: Event, router: &mut Router<'_>) {
    let members = router.members(&event.topic);
    debug!(group = %event.topic, members = members.len(), "broadcasting");
    let from = service_address(BOARDCAST);
    for member in members {
        router.emit(event.readdressed(from.as_str(), member));
    }
}
