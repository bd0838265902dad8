//! WebSocket session lifecycle: handles a single connected browser from
//! upgrade through disconnect.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use relay_core::{MAX_CACHE_SIZE, SessionId};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::connection::ClientConnection;
use super::handler::handle_frame;
use crate::metrics as m;
use crate::relay::Relay;

/// Ping cadence and liveness limit for one session.
#[derive(Clone, Copy, Debug)]
pub struct Heartbeat {
    /// Interval between server-initiated Ping frames.
    pub interval: Duration,
    /// How long to wait for a Pong before considering the client dead.
    pub timeout: Duration,
}

/// Run a WebSocket session for a connected browser.
///
/// 1. Backfills the cached messages and registers for broadcast
/// 2. Dispatches incoming text frames to the relay
/// 3. Forwards queued events to the socket
/// 4. Sends periodic Ping frames and disconnects unresponsive clients
/// 5. Cleans up on disconnect or server shutdown
#[instrument(skip_all, fields(session_id = %session_id))]
pub async fn run_ws_session(
    ws: WebSocket,
    session_id: SessionId,
    relay: Arc<Relay>,
    heartbeat: Heartbeat,
    send_queue_size: usize,
    shutdown: CancellationToken,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    // The outbox must hold a full backfill: history is queued without waiting.
    let (send_tx, mut send_rx) =
        mpsc::channel::<Arc<String>>(send_queue_size.max(MAX_CACHE_SIZE));
    let connection = Arc::new(ClientConnection::new(session_id.clone(), send_tx));

    info!("client connected");
    counter!(m::WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(m::WS_CONNECTIONS_ACTIVE).increment(1.0);

    let backfill = relay.on_session_connect(Arc::clone(&connection)).await;
    debug!(backfill, "backfill queued");

    // Ends the reader when the writer stops (dead client or shutdown).
    let session_done = shutdown.child_token();

    let outbound_conn = Arc::clone(&connection);
    let outbound_done = session_done.clone();
    let outbound = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(heartbeat.interval);
        // Skip the immediate first tick
        let _ = ping_interval.tick().await;

        loop {
            tokio::select! {
                msg = send_rx.recv() => {
                    let Some(text) = msg else { break };
                    if ws_tx.send(Message::Text(String::clone(&text).into())).await.is_err() {
                        break;
                    }
                }
                _ = ping_interval.tick() => {
                    let idle = outbound_conn.idle_for();
                    if idle > heartbeat.timeout {
                        warn!(?idle, "client unresponsive, disconnecting");
                        break;
                    }
                    if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
                () = outbound_done.cancelled() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
        outbound_done.cancel();
    });

    loop {
        let msg = tokio::select! {
            () = session_done.cancelled() => break,
            msg = ws_rx.next() => msg,
        };
        let Some(Ok(msg)) = msg else { break };

        let text = match msg {
            Message::Text(t) => t.as_str().to_owned(),
            Message::Binary(data) => match std::str::from_utf8(&data) {
                Ok(s) => s.to_owned(),
                Err(_) => {
                    debug!(len = data.len(), "ignoring non-UTF8 binary frame");
                    continue;
                }
            },
            Message::Close(_) => {
                info!("client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {
                connection.touch();
                continue;
            }
        };
        connection.touch();

        if let Some(reply) = handle_frame(&relay, &session_id, &text).await {
            if !connection.send_event(&reply) {
                info!("failed to enqueue reply (channel full or closed)");
            }
        }
    }

    info!(dropped = connection.dropped(), "client disconnected");
    counter!(m::WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(m::WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(m::WS_CONNECTION_DURATION_SECONDS).record(connection.age().as_secs_f64());

    relay.on_session_disconnect(&session_id).await;
    session_done.cancel();
    let _ = outbound.await;
}
