//! Settings type definitions.
//!
//! Field names are snake_case so an existing `settings.json` with the four
//! top-level keys (`webhook_url`, `bot_token`, `channel_id`, `server_name`)
//! loads unchanged. Every struct is `#[serde(default)]`, so partial JSON is
//! fine.

use relay_core::LogFormat;
use serde::{Deserialize, Deserializer, Serialize};

/// Root settings type.
///
/// ```json
/// {
///   "webhook_url": "https://discord.com/api/webhooks/1/abc",
///   "bot_token": "…",
///   "channel_id": 123456789012345678,
///   "server_name": "Loneliness Talking Device",
///   "server": { "port": 8080 }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    /// Webhook that outbound browser messages are posted to.
    pub webhook_url: String,
    /// Bot credential for the gateway listener. Empty disables the listener.
    pub bot_token: String,
    /// Channel whose messages are relayed to browsers.
    #[serde(deserialize_with = "de_snowflake")]
    pub channel_id: u64,
    /// Label shown as the page title.
    pub server_name: String,
    /// HTTP / WebSocket server settings.
    pub server: ServerSettings,
    /// Outbound webhook settings.
    pub webhook: WebhookSettings,
    /// Gateway listener settings.
    pub gateway: GatewaySettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

impl RelaySettings {
    /// Whether the inbound listener should run at all.
    pub fn listener_enabled(&self) -> bool {
        !self.bot_token.trim().is_empty()
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            bot_token: String::new(),
            channel_id: 0,
            server_name: "Loneliness Talking Device".to_string(),
            server: ServerSettings::default(),
            webhook: WebhookSettings::default(),
            gateway: GatewaySettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// HTTP / WebSocket server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Maximum concurrent WebSocket sessions.
    pub max_connections: usize,
    /// Interval between server pings, in seconds.
    pub heartbeat_interval_secs: u64,
    /// Disconnect a session after this long without a pong, in seconds.
    pub heartbeat_timeout_secs: u64,
    /// Largest accepted client frame, in bytes.
    pub max_message_size: usize,
    /// Per-session outbound queue depth. At least the cache size, so a full
    /// backfill always fits.
    pub send_queue_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_connections: 200,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            max_message_size: 64 * 1024,
            send_queue_size: 256,
        }
    }
}

/// Outbound webhook settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookSettings {
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

/// Gateway listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// Gateway WebSocket URL.
    pub url: String,
    /// Intent bitmask sent in `Identify`.
    pub intents: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            url: "wss://gateway.discord.gg/?v=10&encoding=json".to_string(),
            // GUILDS | GUILD_MESSAGES | MESSAGE_CONTENT
            intents: (1 << 0) | (1 << 9) | (1 << 15),
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive (`RUST_LOG` wins when set).
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Accept a snowflake ID as either a JSON number or a numeric string.
fn de_snowflake<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Str(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Str(s) if s.trim().is_empty() => Ok(0),
        Raw::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
