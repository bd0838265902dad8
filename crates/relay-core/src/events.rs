//! WebSocket wire format between the relay and browser sessions.
//!
//! Every frame in either direction is a JSON envelope:
//!
//! ```json
//! { "type": "discord_message", "data": { ... } }
//! ```
//!
//! Server → client events are [`ServerEvent`]. Client → server frames are
//! parsed through [`ClientFrame`] into a [`ClientEvent`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::errors::RelayError;
use crate::message::CachedMessage;

/// Event pushed from the relay to a browser session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A relayed platform message (live broadcast or backfill).
    DiscordMessage(CachedMessage),
    /// Confirmation of the display name in effect.
    UsernameSet {
        /// Name in effect after normalization.
        username: String,
    },
    /// Local acknowledgement that an outbound message was delivered.
    MessageSent {
        /// Sender display name.
        username: String,
        /// Trimmed message text.
        content: String,
        /// When the webhook accepted the message.
        timestamp: DateTime<Utc>,
    },
    /// A request from this session failed.
    Error {
        /// Human-readable failure description.
        message: String,
    },
}

impl ServerEvent {
    /// Wire name of the event.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::DiscordMessage(_) => "discord_message",
            Self::UsernameSet { .. } => "username_set",
            Self::MessageSent { .. } => "message_sent",
            Self::Error { .. } => "error",
        }
    }

    /// Build an `error` event with the given text.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Serialize to the JSON envelope.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<&RelayError> for ServerEvent {
    fn from(err: &RelayError) -> Self {
        Self::error(err.to_string())
    }
}

/// Raw client frame: an event name plus optional payload.
#[derive(Clone, Debug, Deserialize)]
pub struct ClientFrame {
    /// Event name (`set_username`, `send_message`).
    #[serde(rename = "type")]
    pub event: String,
    /// Event payload.
    #[serde(default)]
    pub data: Option<Value>,
}

/// A parsed request from a browser session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientEvent {
    /// Register a display name. `None` when the client sent none.
    SetUsername {
        /// Requested name.
        username: Option<String>,
    },
    /// Send chat text to the remote channel.
    SendMessage {
        /// Untrimmed text; empty when the client sent none.
        message: String,
    },
}

/// Why a client frame could not be turned into a [`ClientEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// The frame was not a JSON envelope.
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
    /// The event name is not one the relay handles.
    #[error("Unknown event: {0}")]
    UnknownEvent(String),
    /// The payload did not match the event's shape.
    #[error("Invalid payload for {event}: {reason}")]
    InvalidPayload {
        /// Event name.
        event: String,
        /// Deserialization failure.
        reason: String,
    },
}

#[derive(Default, Deserialize)]
struct SetUsernameData {
    #[serde(default)]
    username: Option<String>,
}

#[derive(Default, Deserialize)]
struct SendMessageData {
    #[serde(default)]
    message: String,
}

impl ClientFrame {
    /// Parse raw frame text into a typed event.
    pub fn parse(text: &str) -> Result<ClientEvent, FrameError> {
        let frame: Self =
            serde_json::from_str(text).map_err(|e| FrameError::InvalidJson(e.to_string()))?;
        frame.into_event()
    }

    /// Convert a decoded frame into a typed event.
    pub fn into_event(self) -> Result<ClientEvent, FrameError> {
        match self.event.as_str() {
            "set_username" => {
                let data: SetUsernameData = decode_data(&self.event, self.data)?;
                Ok(ClientEvent::SetUsername {
                    username: data.username,
                })
            }
            "send_message" => {
                let data: SendMessageData = decode_data(&self.event, self.data)?;
                Ok(ClientEvent::SendMessage {
                    message: data.message,
                })
            }
            _ => Err(FrameError::UnknownEvent(self.event)),
        }
    }
}

fn decode_data<T>(event: &str, data: Option<Value>) -> Result<T, FrameError>
where
    T: Default + for<'de> Deserialize<'de>,
{
    match data {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value).map_err(|e| FrameError::InvalidPayload {
            event: event.to_owned(),
            reason: e.to_string(),
        }),
    }
}
