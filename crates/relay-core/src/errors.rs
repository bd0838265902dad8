//! Error types for relay operations.
//!
//! Every error here is scoped to the single request that caused it and is
//! reported back to the originating session only. Nothing is retried.

use thiserror::Error;

/// Errors surfaced to a browser session as an `error` event.
///
/// The `Display` text is exactly what the session receives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// Outbound send attempted before the session registered a name.
    #[error("Please set a username first")]
    Unauthenticated,
    /// The webhook POST failed (transport error or non-2xx status).
    #[error("Failed to send message: {0}")]
    DeliveryFailed(String),
}

impl RelayError {
    /// Machine-readable code, used for log fields and metric labels.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::DeliveryFailed(_) => "DELIVERY_FAILED",
        }
    }
}
