//! Per-connection agent state.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use ebus_core::{Bus, Event};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// One connected endpoint: its mailbox, a coalescing wake-up signal and the
/// set of groups it has joined.
///
/// The mailbox hook rings the wake-up signal. `Notify` stores at most one
/// permit, so a burst of emits before the consumer wakes collapses into a
/// single wake; the consumer is expected to drain the whole mailbox.
pub struct Agent {
    mailbox: Bus,
    wake: Arc<Notify>,
    closed: CancellationToken,
    groups: Mutex<BTreeSet<String>>,
}

impl Agent {
    /// Create an agent with an empty mailbox wired to its wake-up signal.
    pub fn new() -> Self {
        let wake = Arc::new(Notify::new());
        let mailbox = Bus::new();
        let ring = Arc::clone(&wake);
        mailbox.set_notify_hook(Some(Arc::new(move |_: &Event| ring.notify_one())));
        Self {
            mailbox,
            wake,
            closed: CancellationToken::new(),
            groups: Mutex::new(BTreeSet::new()),
        }
    }

    /// The agent's mailbox.
    pub fn mailbox(&self) -> &Bus {
        &self.mailbox
    }

    /// Wait for the next wake-up.
    ///
    /// Returns `false` once the agent is closed, even if events remain queued.
    pub async fn wait(&self) -> bool {
        tokio::select! {
            biased;
            () = self.closed.cancelled() => false,
            () = self.wake.notified() => !self.closed.is_cancelled(),
        }
    }

    /// Close the wake-up signal and detach the mailbox hook. Idempotent.
    pub fn close(&self) {
        self.mailbox.set_notify_hook(None);
        self.closed.cancel();
    }

    /// Whether [`Agent::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once the agent is closed.
    pub fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.closed.cancelled()
    }

    /// Snapshot of joined group ids, sorted.
    pub fn joined_groups(&self) -> Vec<String> {
        self.groups.lock().iter().cloned().collect()
    }

    /// Whether the agent has joined `group`.
    pub fn is_member(&self, group: &str) -> bool {
        self.groups.lock().contains(group)
    }

    pub(crate) fn record_join(&self, group: &str) {
        let _ = self.groups.lock().insert(group.to_owned());
    }

    pub(crate) fn record_leave(&self, group: &str) {
        let _ = self.groups.lock().remove(group);
    }
}

impl Default for Agent {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("queued", &self.mailbox.len())
            .field("groups", &*self.groups.lock())
            .field("closed", &self.is_closed())
            .finish()
    }
}
