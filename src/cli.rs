//! Command-line surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Addressed event broker over WebSocket.
#[derive(Debug, Parser)]
#[command(name = "ebus", version, about = "Addressed event broker over WebSocket")]
pub struct Cli {
    /// Settings file (overrides `EBUS_SETTINGS` and `~/.ebus/settings.json`).
    #[arg(long, global = true, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Broker URL for client commands (overrides `client.serverUrl`).
    #[arg(long, global = true, value_name = "URL")]
    pub url: Option<String>,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Entry points.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the broker.
    #[command(visible_aliases = ["server", "s"])]
    Serve,

    /// Interactive client: `to topic [data1 data2 ...]` per stdin line.
    #[command(visible_alias = "c")]
    Client,

    /// Print the broker's event throughput once per second.
    Bench {
        /// Requests kept in flight.
        #[arg(long, default_value_t = 16)]
        depth: usize,
    },

    /// Relay clipboard changes to the `clip` group.
    Clip {
        /// Command whose stdout is the clipboard content.
        #[arg(long, default_value = "pbpaste")]
        command: String,

        /// Polling interval in milliseconds.
        #[arg(long, default_value_t = 100)]
        interval_ms: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_aliases() {
        for alias in ["serve", "server", "s"] {
            let cli = Cli::try_parse_from(["ebus", alias]).unwrap();
            assert!(matches!(cli.command, Command::Serve));
        }
    }

    #[test]
    fn client_alias_with_global_url() {
        let cli = Cli::try_parse_from(["ebus", "c", "--url", "ws://example:1/"]).unwrap();
        assert!(matches!(cli.command, Command::Client));
        assert_eq!(cli.url.as_deref(), Some("ws://example:1/"));
    }

    #[test]
    fn clip_defaults() {
        let cli = Cli::try_parse_from(["ebus", "clip"]).unwrap();
        match cli.command {
            Command::Clip {
                command,
                interval_ms,
            } => {
                assert_eq!(command, "pbpaste");
                assert_eq!(interval_ms, 100);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn bench_depth() {
        let cli = Cli::try_parse_from(["ebus", "-v", "bench", "--depth", "4"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Bench { depth: 4 }));
    }

    #[test]
    fn missing_command_is_an_error() {
        assert!(Cli::try_parse_from(["ebus"]).is_err());
    }
}
