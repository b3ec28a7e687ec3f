//! Per-agent FIFO mailbox.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::event::Event;

/// Hook invoked after every enqueue, outside the queue lock.
pub type NotifyHook = Arc<dyn Fn(&Event) + Send + Sync>;

fn noop_hook() -> NotifyHook {
    Arc::new(|_: &Event| {})
}

/// Ordered, unbounded queue of undelivered events for one agent.
///
/// Events are removed only by [`Bus::pop_front`], so a consumer can peek,
/// attempt delivery, and pop only once delivery succeeded. The notify hook
/// runs after the queue lock is released and may re-enter the mailbox.
pub struct Bus {
    events: Mutex<VecDeque<Event>>,
    hook: Mutex<NotifyHook>,
}

impl Bus {
    /// Create an empty mailbox with a no-op hook.
    pub fn new() -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            hook: Mutex::new(noop_hook()),
        }
    }

    /// Append an event to the tail, then run the notify hook.
    pub fn emit(&self, event: Event) {
        let hook = Arc::clone(&self.hook.lock());
        self.events.lock().push_back(event.clone());
        hook(&event);
    }

    /// Clone of the front event, if any. Does not remove it.
    pub fn peek_front(&self) -> Option<Event> {
        self.events.lock().front().cloned()
    }

    /// Remove and return the front event; `None` when empty.
    pub fn pop_front(&self) -> Option<Event> {
        self.events.lock().pop_front()
    }

    /// Replace the notify hook. `None` installs a no-op.
    pub fn set_notify_hook(&self, hook: Option<NotifyHook>) {
        *self.hook.lock() = hook.unwrap_or_else(noop_hook);
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether the mailbox is empty.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus").field("len", &self.len()).finish_non_exhaustive()
    }
}
