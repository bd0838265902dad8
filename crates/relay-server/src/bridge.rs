//! Feeds gateway listener events into the relay hub.
//!
//! The listener pushes [`ListenerEvent`]s into an `mpsc` channel; a single
//! bridge task drains it and calls the hub one event at a time, so inbound
//! messages are cached and broadcast in delivery order.

use std::sync::Arc;

use relay_discord::{GatewayConfig, GatewayListener, ListenerEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::relay::{ListenerStatus, Relay};

/// Listener → bridge channel depth.
const LISTENER_CHANNEL_SIZE: usize = 256;

/// Apply listener events to the hub until the channel closes.
pub async fn run_bridge(relay: Arc<Relay>, mut rx: mpsc::Receiver<ListenerEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            ListenerEvent::Ready { user_id, username } => {
                relay.set_identity(user_id);
                relay.set_listener_status(ListenerStatus::Connected);
                info!(user_id, %username, "relay identity established");
            }
            ListenerEvent::Message(message) => {
                let _ = relay.on_inbound_event(message).await;
            }
        }
    }
}

/// Start the gateway listener and its bridge.
///
/// The returned task finishes when the listener stops. A listener error is
/// logged once and reported as [`ListenerStatus::Failed`]; nothing retries.
pub fn spawn_listener(
    relay: Arc<Relay>,
    config: GatewayConfig,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    relay.set_listener_status(ListenerStatus::Connecting);
    let (tx, rx) = mpsc::channel(LISTENER_CHANNEL_SIZE);
    let bridge = tokio::spawn(run_bridge(Arc::clone(&relay), rx));
    let listener = GatewayListener::new(config, tx);

    tokio::spawn(async move {
        let result = listener.run(cancel).await;
        // The listener owned the only sender; let the bridge drain what is left
        // before the final status is written.
        let _ = bridge.await;
        match result {
            Ok(()) => info!("gateway listener stopped"),
            Err(e) => {
                error!(error = %e, "gateway listener failed");
                relay.set_listener_status(ListenerStatus::Failed);
            }
        }
    })
}
