//! `/health` endpoint.

use std::time::Instant;

use serde::Serialize;

use crate::relay::{ListenerStatus, Relay};

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Current WebSocket connection count.
    pub connections: usize,
    /// Sessions that have registered a display name.
    pub named_sessions: usize,
    /// Messages in the relay cache.
    pub cached_messages: usize,
    /// Gateway listener state.
    pub listener: ListenerStatus,
}

/// Build a health response from the hub's live counters.
pub async fn health_check(start_time: Instant, relay: &Relay) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections: relay.connection_count().await,
        named_sessions: relay.named_sessions(),
        cached_messages: relay.cached_messages().await,
        listener: relay.listener_status(),
    }
}
