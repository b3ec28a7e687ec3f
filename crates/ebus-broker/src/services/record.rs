//! `@record`: `set`, `get` and `sync` over the shared record store.

use ebus_core::address::service_address;
use ebus_core::Event;
use tracing::debug;

use super::RECORD;
use crate::manager::Router;
use crate::metrics::RECORD_BROADCASTS_TOTAL;
use crate::record::record_group;

/// Topic of a write, and of the change notification it fans out.
pub const SET: &str = "set";
/// Topic of a one-shot read.
pub const GET: &str = "get";
/// Topic of a read that also subscribes to future changes.
pub const SYNC: &str = "sync";

pub(super) fn handle(event: Event, router: &mut Router<'_>) {
    match (event.topic.as_str(), event.data.as_slice()) {
        (SET, [key, value]) => set(key, value, router),
        (GET, [key]) => reply(&event, key, router),
        (SYNC, [key]) => {
            let _ = router.join(&record_group(key), &event.from);
            reply(&event, key, router);
        }
        (topic, data) => {
            debug!(from = %event.from, %topic, fields = data.len(), "ignoring malformed record request");
        }
    }
}

fn set(key: &str, value: &str, router: &mut Router<'_>) {
    if !router.records().set(key, value) {
        return;
    }
    metrics::counter!(RECORD_BROADCASTS_TOTAL).increment(1);
    let from = service_address(RECORD);
    for member in router.members(&record_group(key)) {
        router.emit(Event::new(member, SET, [key, value]).with_from(from.as_str()));
    }
}

fn reply(request: &Event, key: &str, router: &mut Router<'_>) {
    let value = router.records().get(key);
    router.emit(request.reply(service_address(RECORD), request.topic.as_str(), [key.to_owned(), value]));
}
