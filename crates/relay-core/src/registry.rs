//! Display names registered by live sessions.
//!
//! A session without an entry is *unnamed* and may not send outbound
//! messages. Registering again overwrites the previous name; disconnecting
//! removes the entry for good.

use std::collections::HashMap;

use crate::ids::SessionId;

/// Name used when a session registers without one.
pub const DEFAULT_DISPLAY_NAME: &str = "Anonymous";

/// Longest display name kept, in characters.
///
/// The webhook username is `"Web User: " + name` and the platform rejects
/// usernames over 80 characters.
pub const MAX_DISPLAY_NAME_CHARS: usize = 70;

/// Map of session ID to display name.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    names: HashMap<SessionId, String>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the display name for a session.
    ///
    /// Returns the name actually in effect after normalization.
    pub fn set_name(&mut self, session_id: SessionId, requested: Option<&str>) -> String {
        let name = normalize_display_name(requested);
        let _ = self.names.insert(session_id, name.clone());
        name
    }

    /// Display name of a session, if it has registered one.
    pub fn name_of(&self, session_id: &SessionId) -> Option<&str> {
        self.names.get(session_id).map(String::as_str)
    }

    /// Remove a session's record. Returns the name it had, if any.
    pub fn remove(&mut self, session_id: &SessionId) -> Option<String> {
        self.names.remove(session_id)
    }

    /// Number of named sessions.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no session has a name.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Keep the requested name as given, fall back to [`DEFAULT_DISPLAY_NAME`]
/// when it is absent or empty, and cap it at [`MAX_DISPLAY_NAME_CHARS`].
pub fn normalize_display_name(requested: Option<&str>) -> String {
    match requested {
        Some(name) if !name.is_empty() => name.chars().take(MAX_DISPLAY_NAME_CHARS).collect(),
        _ => DEFAULT_DISPLAY_NAME.to_owned(),
    }
}
