//! Discord Gateway v10 payloads (JSON encoding), the subset the listener uses.
//!
//! All functions here are pure so the gateway loop can stay thin.

use chrono::{DateTime, Utc};
use relay_core::InboundEvent;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::errors::GatewayError;

/// Gateway opcodes.
pub mod op {
    /// Event dispatch.
    pub const DISPATCH: u8 = 0;
    /// Heartbeat (either direction).
    pub const HEARTBEAT: u8 = 1;
    /// Client identify.
    pub const IDENTIFY: u8 = 2;
    /// Server asks the client to reconnect.
    pub const RECONNECT: u8 = 7;
    /// Server invalidated the session.
    pub const INVALID_SESSION: u8 = 9;
    /// First frame after connecting; carries the heartbeat interval.
    pub const HELLO: u8 = 10;
    /// Heartbeat acknowledged.
    pub const HEARTBEAT_ACK: u8 = 11;
}

const CDN_BASE: &str = "https://cdn.discordapp.com";

/// A decoded gateway frame.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct GatewayPayload {
    /// Opcode.
    pub op: u8,
    /// Event data.
    #[serde(default)]
    pub d: Value,
    /// Sequence number, set on dispatches.
    #[serde(default)]
    pub s: Option<u64>,
    /// Event name, set on dispatches.
    #[serde(default)]
    pub t: Option<String>,
}

/// Decode a text frame.
pub fn parse_payload(text: &str) -> Result<GatewayPayload, GatewayError> {
    serde_json::from_str(text).map_err(|e| GatewayError::Protocol(format!("bad payload: {e}")))
}

/// Heartbeat interval in milliseconds from a `Hello` payload.
pub fn hello_interval_ms(payload: &GatewayPayload) -> Result<u64, GatewayError> {
    payload
        .d
        .get("heartbeat_interval")
        .and_then(Value::as_u64)
        .filter(|ms| *ms > 0)
        .ok_or_else(|| GatewayError::Protocol("hello without heartbeat_interval".into()))
}

/// Op 1 frame carrying the last seen sequence number.
pub fn heartbeat_payload(seq: Option<u64>) -> Value {
    json!({ "op": op::HEARTBEAT, "d": seq })
}

/// Op 2 frame.
pub fn identify_payload(token: &str, intents: u64) -> Value {
    json!({
        "op": op::IDENTIFY,
        "d": {
            "token": token,
            "intents": intents,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "relay",
                "device": "relay",
            },
        },
    })
}

/// CDN URL of a user's avatar. Animated hashes (`a_` prefix) use GIF.
pub fn avatar_url(user_id: u64, hash: &str) -> String {
    let ext = if hash.starts_with("a_") { "gif" } else { "png" };
    format!("{CDN_BASE}/avatars/{user_id}/{hash}.{ext}?size=1024")
}

#[derive(Deserialize)]
struct RawUser {
    id: String,
    username: String,
    #[serde(default)]
    avatar: Option<String>,
}

#[derive(Deserialize)]
struct RawReady {
    user: RawUser,
}

#[derive(Deserialize)]
struct RawMessage {
    channel_id: String,
    #[serde(default)]
    content: String,
    timestamp: DateTime<Utc>,
    author: RawUser,
}

fn snowflake(raw: &str, field: &str) -> Result<u64, GatewayError> {
    raw.parse()
        .map_err(|_| GatewayError::Protocol(format!("{field} is not a snowflake: {raw:?}")))
}

/// Bot user `(id, username)` from a `READY` dispatch.
pub fn ready_user(d: &Value) -> Result<(u64, String), GatewayError> {
    let ready = RawReady::deserialize(d)
        .map_err(|e| GatewayError::Protocol(format!("bad READY: {e}")))?;
    let id = snowflake(&ready.user.id, "user.id")?;
    Ok((id, ready.user.username))
}

/// Inbound event from a `MESSAGE_CREATE` dispatch.
pub fn message_from_dispatch(d: &Value) -> Result<InboundEvent, GatewayError> {
    let msg = RawMessage::deserialize(d)
        .map_err(|e| GatewayError::Protocol(format!("bad MESSAGE_CREATE: {e}")))?;
    let author_id = snowflake(&msg.author.id, "author.id")?;
    Ok(InboundEvent {
        channel_id: snowflake(&msg.channel_id, "channel_id")?,
        author_id,
        author_name: msg.author.username,
        author_avatar: msg.author.avatar.map(|hash| avatar_url(author_id, &hash)),
        content: msg.content,
        created_at: msg.timestamp,
    })
}
