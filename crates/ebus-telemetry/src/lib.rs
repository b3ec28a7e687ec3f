//! # ebus-telemetry
//!
//! Installs the process-wide `tracing` subscriber: an [`EnvFilter`] built
//! from the configured level (`RUST_LOG` wins when set) feeding either a
//! human-readable or a JSON formatter on stderr.

#![deny(unsafe_code)]

use std::fmt::Write as _;

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default filter directive. Overridden by `RUST_LOG`.
    pub level: String,
    /// Per-module level overrides (e.g. `"ebus_broker"` => DEBUG).
    pub module_levels: Vec<(String, Level)>,
    /// Emit JSON lines instead of text.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            module_levels: Vec::new(),
            json: false,
        }
    }
}

/// Telemetry setup failures.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The configured level is not a valid filter directive.
    #[error("invalid log filter {directive:?}: {source}")]
    Filter {
        /// The rejected directive.
        directive: String,
        /// Parser error.
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    /// Another global subscriber was installed first.
    #[error("failed to install subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// Filter directive for `config`: the base level followed by module overrides.
pub fn filter_directive(config: &TelemetryConfig) -> String {
    let mut directive = config.level.trim().to_lowercase();
    if directive.is_empty() {
        directive.push_str("info");
    }
    for (module, level) in &config.module_levels {
        let _ = write!(directive, ",{module}={}", level.as_str().to_lowercase());
    }
    directive
}

/// Build the filter: `RUST_LOG` if set and valid, else [`filter_directive`].
pub fn build_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directive = filter_directive(config);
    EnvFilter::try_new(&directive).map_err(|source| TelemetryError::Filter { directive, source })
}

/// Initialize logging. Call once at startup.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(config)?;

    let fmt = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);
    let layer: Box<dyn Layer<Registry> + Send + Sync> = if config.json {
        fmt.json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed()
    } else {
        fmt.boxed()
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directive_is_info() {
        assert_eq!(filter_directive(&TelemetryConfig::default()), "info");
    }

    #[test]
    fn empty_level_falls_back_to_info() {
        let config = TelemetryConfig {
            level: "  ".into(),
            ..TelemetryConfig::default()
        };
        assert_eq!(filter_directive(&config), "info");
    }

    #[test]
    fn module_levels_are_appended() {
        let config = TelemetryConfig {
            level: "WARN".into(),
            module_levels: vec![
                ("ebus_broker".into(), Level::DEBUG),
                ("ebus_server".into(), Level::TRACE),
            ],
            json: true,
        };
        assert_eq!(
            filter_directive(&config),
            "warn,ebus_broker=debug,ebus_server=trace"
        );
    }

    #[test]
    fn directive_parses_as_env_filter() {
        let config = TelemetryConfig {
            level: "debug".into(),
            module_levels: vec![("hyper".into(), Level::WARN)],
            json: false,
        };
        assert!(EnvFilter::try_new(filter_directive(&config)).is_ok());
    }

    #[test]
    fn filter_error_names_the_directive() {
        let source = EnvFilter::try_new("ebus=loud").unwrap_err();
        let err = TelemetryError::Filter {
            directive: "ebus=loud".into(),
            source,
        };
        assert!(err.to_string().contains("ebus=loud"));
    }
}
