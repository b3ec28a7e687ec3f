//! `ebus client`: line-oriented interactive client.

use anyhow::{Context, Result};
use ebus_client::Client;
use ebus_core::Event;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

const USAGE: &str = "to topic [data1 data2 ...]";

/// Connect to `url`, print every received event and send one event per
/// stdin line until stdin or the connection closes.
pub async fn run(url: &str) -> Result<()> {
    let client = Client::connect(url, |event: Event| println!("{}", render(&event)))
        .await
        .with_context(|| format!("Failed to connect to {url}"))?;

    println!("{USAGE}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            () = client.closed() => {
                debug!("connection closed");
                break;
            }
            line = lines.next_line() => line.context("Failed to read stdin")?,
        };
        let Some(line) = line else { break };
        match parse_line(&line) {
            Some(event) => client.emit(event)?,
            None => println!("{USAGE}"),
        }
    }

    client.close();
    Ok(())
}

/// `to topic [data...]` split on single spaces. Fewer than two fields is
/// not an event.
fn parse_line(line: &str) -> Option<Event> {
    let mut fields = line.split(' ');
    let to = fields.next()?;
    let topic = fields.next()?;
    Some(Event::new(to, topic, fields))
}

fn render(event: &Event) -> String {
    format!("{} :[ {} ]: [{}]", event.from, event.topic, event.data.join(" "))
}
