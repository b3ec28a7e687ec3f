//! `ebus clip`: clipboard relay over the `clip` group.

use std::time::Duration;

use anyhow::{Context, Result};
use ebus_client::Client;
use ebus_core::Event;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Group (and topic) clipboard contents are broadcast to.
pub const CLIP_GROUP: &str = "clip";

/// Poll `command` every `interval_ms` and broadcast each change to
/// [`CLIP_GROUP`]. Clips broadcast by other relays are printed.
pub async fn run(url: &str, command: &str, interval_ms: u64) -> Result<()> {
    let client = Client::connect(url, |event: Event| {
        if let Some(clip) = received_clip(&event) {
            info!(from = %event.from, bytes = clip.len(), "clip received");
            println!("{clip}");
        }
    })
    .await
    .with_context(|| format!("Failed to connect to {url}"))?;
    client.join(CLIP_GROUP)?;

    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
    let mut last = Dedup::default();
    loop {
        tokio::select! {
            () = client.closed() => {
                info!("connection closed");
                return Ok(());
            }
            _ = ticker.tick() => {}
        }
        let content = match read_clipboard(command).await {
            Ok(content) => content,
            Err(error) => {
                warn!(%command, %error, "clipboard command failed");
                continue;
            }
        };
        if last.changed(&content) {
            debug!(bytes = content.len(), "clipboard changed");
            client.broadcast(CLIP_GROUP, [content])?;
        }
    }
}

async fn read_clipboard(command: &str) -> Result<String> {
    let mut parts = command.split_whitespace();
    let program = parts.next().context("empty clipboard command")?;
    let output = Command::new(program).args(parts).output().await?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// A clip relayed by `@boardcast`. Our own broadcasts come back too since
/// the relay is a member of the group.
fn received_clip(event: &Event) -> Option<&str> {
    if event.from != "@boardcast" || event.topic != CLIP_GROUP {
        return None;
    }
    event.data.first().map(String::as_str)
}

/// Remembers the last value seen.
#[derive(Debug, Default)]
struct Dedup {
    last: String,
}

impl Dedup {
    fn changed(&mut self, value: &str) -> bool {
        if self.last == value {
            return false;
        }
        value.clone_into(&mut self.last);
        true
    }
}
