//! `ebus bench`: measure broker throughput through `@status/event_count`.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use ebus_client::Client;
use ebus_core::Event;
use tracing::debug;

/// Keep `depth` event-count requests in flight and print the counter's
/// per-second delta until the connection closes.
pub async fn run(url: &str, depth: usize) -> Result<()> {
    let (client, mut events) = Client::connect_with_channel(url)
        .await
        .with_context(|| format!("Failed to connect to {url}"))?;

    for _ in 0..depth.max(1) {
        client.status_event_count()?;
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut rate = Rate::default();
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(per_sec) = rate.tick() {
                    println!("{per_sec} /sec");
                }
            }
            event = events.recv() => {
                let Some(event) = event else {
                    bail!("connection closed");
                };
                if let Some(count) = event_count(&event) {
                    rate.observe(count);
                    client.status_event_count()?;
                } else {
                    debug!(from = %event.from, topic = %event.topic, "ignored");
                }
            }
        }
    }
}

fn event_count(event: &Event) -> Option<u64> {
    if event.from != "@status" || event.topic != "event_count" {
        return None;
    }
    event.data.first()?.parse().ok()
}

/// Per-tick delta of a monotonic counter. The first tick with a sample only
/// establishes the baseline.
#[derive(Debug, Default)]
struct Rate {
    last: Option<u64>,
    current: Option<u64>,
}

impl Rate {
    fn observe(&mut self, count: u64) {
        self.current = Some(count);
    }

    fn tick(&mut self) -> Option<u64> {
        let current = self.current?;
        let last = self.last.replace(current)?;
        Some(current.saturating_sub(last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_count_only_from_status() {
        let reply = Event::new("&1", "event_count", ["42"]).with_from("@status");
        assert_eq!(event_count(&reply), Some(42));

        let spoofed = Event::new("&1", "event_count", ["42"]).with_from("&2");
        assert_eq!(event_count(&spoofed), None);

        let garbage = Event::new("&1", "event_count", ["x"]).with_from("@status");
        assert_eq!(event_count(&garbage), None);
    }

    #[test]
    fn rate_needs_a_baseline() {
        let mut rate = Rate::default();
        assert_eq!(rate.tick(), None);

        rate.observe(100);
        assert_eq!(rate.tick(), None);

        rate.observe(350);
        assert_eq!(rate.tick(), Some(250));

        assert_eq!(rate.tick(), Some(0));
    }
}
