//! Inbound chat events and the cached form relayed to browsers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat message observed on the remote platform.
///
/// Produced by the gateway listener for every `MESSAGE_CREATE` it sees,
/// before any channel or identity filtering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundEvent {
    /// Channel the message was posted in.
    pub channel_id: u64,
    /// Author user ID.
    pub author_id: u64,
    /// Author display name.
    pub author_name: String,
    /// Full avatar URL, if the author has one.
    pub author_avatar: Option<String>,
    /// Message text.
    pub content: String,
    /// When the platform created the message.
    pub created_at: DateTime<Utc>,
}

/// A relayed message as held in the cache and sent to browsers.
///
/// Field names match the browser client (`username`, `content`,
/// `timestamp`, `avatar_url`). Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedMessage {
    /// Author display name.
    pub username: String,
    /// Message text.
    pub content: String,
    /// Creation time on the remote platform.
    pub timestamp: DateTime<Utc>,
    /// Avatar URL, empty when the author has none.
    pub avatar_url: String,
}

impl From<InboundEvent> for CachedMessage {
    fn from(event: InboundEvent) -> Self {
        Self {
            username: event.author_name,
            content: event.content,
            timestamp: event.created_at,
            avatar_url: event.author_avatar.unwrap_or_default(),
        }
    }
}
