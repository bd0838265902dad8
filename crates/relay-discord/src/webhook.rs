//! Webhook client backed by `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use relay_core::{RelayError, WebhookClient, WebhookPayload};
use tracing::debug;

/// Posts browser messages to a Discord webhook URL.
pub struct DiscordWebhook {
    client: reqwest::Client,
    url: String,
}

impl DiscordWebhook {
    /// Create a client for `url` with a per-request timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("relay/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl WebhookClient for DiscordWebhook {
    async fn post(&self, payload: &WebhookPayload) -> Result<(), RelayError> {
        if self.url.trim().is_empty() {
            return Err(RelayError::DeliveryFailed(
                "webhook URL is not configured".into(),
            ));
        }

        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| RelayError::DeliveryFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::DeliveryFailed(format!(
                "webhook returned HTTP {}",
                status.as_u16()
            )));
        }
        debug!(status = status.as_u16(), "webhook accepted message");
        Ok(())
    }
}
