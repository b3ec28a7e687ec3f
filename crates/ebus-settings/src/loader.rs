//! Settings file discovery, layering and `EBUS_*` overrides.
//!
//! Defaults are serialized to JSON, the user file is overlaid on top of them
//! with [`deep_merge`], and the result is deserialized back before the
//! environment gets the last word. A key set to `null` in the file keeps
//! its default.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::EbusSettings;

/// Env var naming an explicit settings file.
pub const SETTINGS_ENV: &str = "EBUS_SETTINGS";

/// Resolve the settings file path: `EBUS_SETTINGS`, else
/// `~/.ebus/settings.json`.
pub fn settings_path() -> PathBuf {
    if let Some(path) = std::env::var(SETTINGS_ENV).ok().filter(|v| !v.is_empty()) {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".ebus").join("settings.json")
}

/// [`load_settings_from_path`] on [`settings_path`].
pub fn load_settings() -> Result<EbusSettings> {
    load_settings_from_path(&settings_path())
}

/// Defaults, then `path` if it exists, then the environment, then
/// validation. A missing file is not an error.
pub fn load_settings_from_path(path: &Path) -> Result<EbusSettings> {
    let mut merged = serde_json::to_value(EbusSettings::default())?;

    if path.exists() {
        debug!(?path, "reading settings file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        deep_merge(&mut merged, user);
    } else {
        debug!(?path, "no settings file");
    }

    let mut settings: EbusSettings =
        serde_json::from_value(merged).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

/// Overlay `overlay` onto `base`. Objects merge key by key, `null` keeps
/// what `base` had, and any other value replaces it wholesale.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                if let Some(slot) = base.get_mut(&key) {
                    deep_merge(slot, value);
                } else if !value.is_null() {
                    let _ = base.insert(key, value);
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Apply `EBUS_*` overrides from the process environment.
pub fn apply_env_overrides(settings: &mut EbusSettings) {
    apply_env_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply `EBUS_*` overrides read through `lookup`.
///
/// Invalid values are logged and ignored, leaving the file/default value.
pub fn apply_env_overrides_from<F>(settings: &mut EbusSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    if let Some(v) = env.string("EBUS_ADDR") {
        settings.server.bind_addr = v;
    }
    if let Some(v) = env.bool("EBUS_TLS") {
        settings.server.tls.enabled = v;
    }
    if let Some(v) = env.string("EBUS_TLS_CERT") {
        settings.server.tls.cert_path = v;
    }
    if let Some(v) = env.string("EBUS_TLS_KEY") {
        settings.server.tls.key_path = v;
    }
    if let Some(v) = env.size("EBUS_MAX_FRAME_BYTES", FRAME_BYTES_RANGE) {
        settings.server.max_frame_bytes = v;
    }
    if let Some(v) = env.string("EBUS_SERVER_URL") {
        settings.client.server_url = v;
    }
    if let Some(v) = env.string("EBUS_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.bool("EBUS_LOG_JSON") {
        settings.logging.json = v;
    }
}

/// Accepted `EBUS_MAX_FRAME_BYTES` values.
const FRAME_BYTES_RANGE: RangeInclusive<usize> = 64..=1 << 30;

fn validate(settings: &EbusSettings) -> Result<()> {
    if settings.server.bind_addr.trim().is_empty() {
        return Err(SettingsError::Invalid {
            field: "server.bindAddr",
            reason: "must not be empty",
        });
    }
    if settings.server.max_frame_bytes == 0 {
        return Err(SettingsError::Invalid {
            field: "server.maxFrameBytes",
            reason: "must be positive",
        });
    }
    Ok(())
}

/// `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`, any case, surrounding
/// whitespace ignored.
pub fn parse_bool(val: &str) -> Option<bool> {
    const TRUE: [&str; 4] = ["true", "1", "yes", "on"];
    const FALSE: [&str; 4] = ["false", "0", "no", "off"];
    let val = val.trim();
    if TRUE.iter().any(|t| t.eq_ignore_ascii_case(val)) {
        Some(true)
    } else if FALSE.iter().any(|f| f.eq_ignore_ascii_case(val)) {
        Some(false)
    } else {
        None
    }
}

/// A byte count inside `range`.
pub fn parse_size(val: &str, range: RangeInclusive<usize>) -> Option<usize> {
    val.trim().parse().ok().filter(|n| range.contains(n))
}

// ── Env var readers ─────────────────────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn bool(&self, name: &str) -> Option<bool> {
        let val = (self.lookup)(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    fn size(&self, name: &str, range: RangeInclusive<usize>) -> Option<usize> {
        let val = (self.lookup)(name)?;
        let result = parse_size(&val, range.clone());
        if result.is_none() {
            warn!(
                key = name,
                value = %val,
                min = range.start(),
                max = range.end(),
                "size env var out of range, ignoring"
            );
        }
        result
    }
}
