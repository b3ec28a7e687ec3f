//! # ebus-settings
//!
//! Configuration for the server, the clients and logging.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`EbusSettings::default()`]
//! 2. **Settings file**: JSON, deep-merged over defaults. The path comes from
//!    the caller, `EBUS_SETTINGS`, or `~/.ebus/settings.json`.
//! 3. **Environment variables**: `EBUS_*` overrides (highest priority)
//!
//! Nothing here is global; callers load once and pass the value down.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_env_overrides_from, deep_merge, load_settings,
    load_settings_from_path, settings_path,
};
pub use types::{ClientSettings, EbusSettings, LoggingSettings, ServerSettings, TlsSettings};
