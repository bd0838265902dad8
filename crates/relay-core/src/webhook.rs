//! Outbound webhook seam.
//!
//! The relay hub only sees the [`WebhookClient`] trait; the `reqwest`-backed
//! implementation lives in `relay-discord`, and tests substitute stubs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::RelayError;

/// Prefix prepended to a browser user's display name on the remote platform.
pub const WEB_USER_LABEL: &str = "Web User: ";

/// JSON body of the outbound webhook POST.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Message text.
    pub content: String,
    /// Username shown on the remote platform.
    pub username: String,
}

impl WebhookPayload {
    /// Build the payload for a browser user's message.
    pub fn from_web_user(display_name: &str, content: &str) -> Self {
        Self {
            content: content.to_owned(),
            username: format!("{WEB_USER_LABEL}{display_name}"),
        }
    }
}

/// Posts messages to the remote channel.
#[async_trait]
pub trait WebhookClient: Send + Sync {
    /// Issue exactly one POST. Any transport failure or non-2xx status maps
    /// to [`RelayError::DeliveryFailed`].
    async fn post(&self, payload: &WebhookPayload) -> Result<(), RelayError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn web_user_payload() {
        let payload = WebhookPayload::from_web_user("Anonymous", "hi");
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"content": "hi", "username": "Web User: Anonymous"})
        );
    }
}
