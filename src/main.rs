//! # ebus
//!
//! Broker binary: loads settings, installs logging and dispatches to the
//! `serve`, `client`, `bench` or `clip` command.

#![deny(unsafe_code)]

mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use ebus_settings::{load_settings, load_settings_from_path, EbusSettings};
use ebus_telemetry::{init_telemetry, TelemetryConfig};

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let mut settings = match &args.settings {
        Some(path) => load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => load_settings().context("Failed to load settings")?,
    };
    if let Some(url) = &args.url {
        settings.client.server_url.clone_from(url);
    }

    init_telemetry(&telemetry_config(&settings, args.verbose))
        .context("Failed to initialize logging")?;

    match args.command {
        Command::Serve => commands::serve::run(&settings).await,
        Command::Client => commands::interactive::run(&settings.client.server_url).await,
        Command::Bench { depth } => commands::bench::run(&settings.client.server_url, depth).await,
        Command::Clip {
            command,
            interval_ms,
        } => commands::clip::run(&settings.client.server_url, &command, interval_ms).await,
    }
}

fn telemetry_config(settings: &EbusSettings, verbose: bool) -> TelemetryConfig {
    TelemetryConfig {
        level: if verbose {
            "debug".to_string()
        } else {
            settings.logging.level.clone()
        },
        module_levels: Vec::new(),
        json: settings.logging.json,
    }
}
