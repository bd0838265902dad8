//! Shared test doubles.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use relay_core::{RelayError, WebhookClient, WebhookPayload};

/// Webhook stub that records payloads and can be told to fail.
#[derive(Default)]
pub(crate) struct CountingWebhook {
    calls: AtomicUsize,
    pub(crate) payloads: Mutex<Vec<WebhookPayload>>,
    fail_with: Option<String>,
}

impl CountingWebhook {
    pub(crate) fn failing(reason: &str) -> Self {
        Self {
            fail_with: Some(reason.into()),
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebhookClient for CountingWebhook {
    async fn post(&self, payload: &WebhookPayload) -> Result<(), RelayError> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        self.payloads.lock().push(payload.clone());
        match &self.fail_with {
            Some(reason) => Err(RelayError::DeliveryFailed(reason.clone())),
            None => Ok(()),
        }
    }
}
