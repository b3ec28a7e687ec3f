//! Settings error types.

use std::path::PathBuf;

use thiserror::Error;

/// Why a settings load failed.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The file exists but could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        /// Settings file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid JSON, or does not fit the settings schema.
    #[error("cannot parse {}: {source}", .path.display())]
    Parse {
        /// Settings file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// The defaults failed to round-trip through JSON.
    #[error("settings schema error: {0}")]
    Schema(#[from] serde_json::Error),
    /// A field holds a value the broker cannot run with.
    #[error("{field}: {reason}")]
    Invalid {
        /// Dotted camelCase path of the field, as written in the file.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;
