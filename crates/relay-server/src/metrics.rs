//! Prometheus metrics recorder and metric names.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Call once at startup before any metrics are recorded.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric name constants to avoid typos across modules.

/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Upgrades refused because the connection cap was reached (counter).
pub const WS_CONNECTIONS_REJECTED_TOTAL: &str = "ws_connections_rejected_total";
/// Active WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// WebSocket connection lifetime (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// Messages not queued to a session because its queue was full or closed (counter).
pub const WS_BROADCAST_DROPS_TOTAL: &str = "ws_broadcast_drops_total";
/// Client frames rejected as malformed or unknown (counter).
pub const WS_INVALID_FRAMES_TOTAL: &str = "ws_invalid_frames_total";
/// Inbound platform messages cached and broadcast (counter).
pub const INBOUND_ACCEPTED_TOTAL: &str = "inbound_accepted_total";
/// Inbound platform messages discarded (counter, labels: reason).
pub const INBOUND_DISCARDED_TOTAL: &str = "inbound_discarded_total";
/// Messages currently cached (gauge).
pub const CACHE_MESSAGES: &str = "cache_messages";
/// Outbound messages accepted by the webhook (counter).
pub const OUTBOUND_SENT_TOTAL: &str = "outbound_sent_total";
/// Outbound messages rejected (counter, labels: code).
pub const OUTBOUND_FAILED_TOTAL: &str = "outbound_failed_total";
/// Webhook POST duration (histogram).
pub const WEBHOOK_REQUEST_DURATION_SECONDS: &str = "webhook_request_duration_seconds";
