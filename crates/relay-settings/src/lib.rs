//! # relay-settings
//!
//! Settings for the chat relay, loaded once at startup from three layers
//! (in priority order):
//! 1. **Compiled defaults**: [`RelaySettings::default()`]
//! 2. **Settings file**: `settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `RELAY_*` overrides (highest priority)
//!
//! The loaded value is read-only for the life of the process and is handed to
//! the components that need it; there is no global instance.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{load_settings, load_settings_from_path, merge_json, settings_path};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = RelaySettings::default();
        let _path = settings_path();
    }

    #[test]
    fn default_settings_match_standalone_behavior() {
        let settings = RelaySettings::default();
        assert_eq!(settings.webhook_url, "");
        assert_eq!(settings.bot_token, "");
        assert_eq!(settings.channel_id, 0);
        assert_eq!(settings.server_name, "Loneliness Talking Device");
        assert_eq!(settings.server.port, 5000);
        assert!(!settings.listener_enabled());
    }
}
