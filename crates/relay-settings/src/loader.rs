//! Reading `settings.json` and layering `RELAY_*` overrides on top.
//!
//! The file is merged into the serialized defaults as JSON, so any key the
//! file leaves out (or sets to `null`) keeps its default. Objects merge
//! key by key; arrays and scalars are replaced whole.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use relay_core::MAX_CACHE_SIZE;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::RelaySettings;

/// Default settings file, relative to the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";

const PORT_RANGE: RangeInclusive<u16> = 1..=u16::MAX;
const WEBHOOK_TIMEOUT_RANGE_MS: RangeInclusive<u64> = 100..=300_000;

/// `RELAY_SETTINGS` if set, otherwise `./settings.json`.
pub fn settings_path() -> PathBuf {
    env_lookup("RELAY_SETTINGS").map_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE), PathBuf::from)
}

/// Load from [`settings_path`].
pub fn load_settings() -> Result<RelaySettings> {
    load_settings_from_path(&settings_path())
}

/// Load `path` over the defaults, apply process environment overrides, and
/// validate.
///
/// A missing file yields defaults. Unreadable files, invalid JSON, and
/// invalid values are errors.
pub fn load_settings_from_path(path: &Path) -> Result<RelaySettings> {
    let mut settings = load_file_layer(path)?;
    apply_overrides(&mut settings, env_lookup);
    validate(&settings)?;
    Ok(settings)
}

/// Defaults merged with the file at `path`, before any overrides.
pub fn load_file_layer(path: &Path) -> Result<RelaySettings> {
    let mut merged = serde_json::to_value(RelaySettings::default())?;
    match std::fs::read_to_string(path) {
        Ok(content) => {
            debug!(path = %path.display(), "merging settings file");
            merge_json(&mut merged, serde_json::from_str(&content)?);
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no settings file, using defaults");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(serde_json::from_value(merged)?)
}

/// Merge `overlay` into `base` in place. `null` in the overlay is ignored.
pub fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None if value.is_null() => {}
                    None => {
                        let _ = base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Apply `RELAY_*` overrides read through `lookup`.
///
/// Values that fail to parse or fall outside their range are logged and
/// skipped, leaving the file or default value in place.
pub fn apply_overrides<F>(settings: &mut RelaySettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let text = |key: &str| lookup(key).filter(|v| !v.is_empty());

    if let Some(v) = text("RELAY_WEBHOOK_URL") {
        settings.webhook_url = v;
    }
    if let Some(v) = text("RELAY_BOT_TOKEN") {
        settings.bot_token = v;
    }
    if let Some(v) = number_override(&text, "RELAY_CHANNEL_ID", 0..=u64::MAX) {
        settings.channel_id = v;
    }
    if let Some(v) = text("RELAY_SERVER_NAME") {
        settings.server_name = v;
    }
    if let Some(v) = text("RELAY_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = number_override(&text, "RELAY_PORT", PORT_RANGE) {
        settings.server.port = v;
    }
    if let Some(v) = number_override(&text, "RELAY_WEBHOOK_TIMEOUT_MS", WEBHOOK_TIMEOUT_RANGE_MS) {
        settings.webhook.timeout_ms = v;
    }
    if let Some(v) = text("RELAY_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

fn number_override<T>(
    text: &impl Fn(&str) -> Option<String>,
    key: &str,
    range: RangeInclusive<T>,
) -> Option<T>
where
    T: FromStr + PartialOrd,
{
    let raw = text(key)?;
    let parsed = parse_in_range(&raw, range);
    if parsed.is_none() {
        warn!(key, value = %raw, "ignoring invalid environment override");
    }
    parsed
}

/// Reject settings the relay cannot run with.
pub fn validate(settings: &RelaySettings) -> Result<()> {
    let invalid = |msg: String| Err(SettingsError::InvalidValue(msg));
    let server = &settings.server;

    let url = settings.webhook_url.trim();
    if !url.is_empty() && !url.starts_with("http://") && !url.starts_with("https://") {
        return invalid(format!("webhook_url must be an http(s) URL, got {url:?}"));
    }
    if server.heartbeat_interval_secs == 0 {
        return invalid("server.heartbeat_interval_secs must be at least 1".into());
    }
    if server.heartbeat_timeout_secs < server.heartbeat_interval_secs {
        return invalid("server.heartbeat_timeout_secs is shorter than the interval".into());
    }
    if server.max_connections == 0 {
        return invalid("server.max_connections must be at least 1".into());
    }
    if server.send_queue_size < MAX_CACHE_SIZE {
        return invalid(format!(
            "server.send_queue_size must be at least {MAX_CACHE_SIZE} to hold the backfill"
        ));
    }
    if settings.listener_enabled() && settings.channel_id == 0 {
        warn!("bot_token is set but channel_id is 0; nothing will be relayed to browsers");
    }
    Ok(())
}

/// Parse a trimmed number and check it against `range`.
pub fn parse_in_range<T>(raw: &str, range: RangeInclusive<T>) -> Option<T>
where
    T: FromStr + PartialOrd,
{
    raw.trim().parse().ok().filter(|n| range.contains(n))
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
