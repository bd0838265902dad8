//! Gateway listener: one WebSocket session, no reconnect.
//!
//! ```text
//! connect ─► Hello(op 10) ─► Identify(op 2) ─► READY ─► MESSAGE_CREATE …
//!                 │
//!                 └─► heartbeat(op 1) every interval, ack(op 11) expected
//! ```
//!
//! Events go out over an `mpsc` channel in delivery order. The listener
//! returns `Ok(())` when cancelled or when the receiving side goes away, and a
//! [`GatewayError`] for everything else.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use relay_core::InboundEvent;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::errors::GatewayError;
use crate::protocol::{self, GatewayPayload, op};

/// Connection parameters for the listener.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Gateway WebSocket URL.
    pub url: String,
    /// Bot token sent in `Identify`.
    pub token: String,
    /// Intent bitmask sent in `Identify`.
    pub intents: u64,
}

/// What the listener reports to the relay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListenerEvent {
    /// Session established; `user_id` is the relay's own identity.
    Ready {
        /// Bot user ID.
        user_id: u64,
        /// Bot username.
        username: String,
    },
    /// A message was created in some channel the bot can see.
    Message(InboundEvent),
}

/// Owns the gateway connection for the life of the listener task.
pub struct GatewayListener {
    config: GatewayConfig,
    tx: mpsc::Sender<ListenerEvent>,
}

/// Loop state that outlives a single frame.
#[derive(Default)]
struct SessionState {
    seq: Option<u64>,
    heartbeat: Option<Interval>,
    awaiting_ack: bool,
}

/// Whether the loop should keep going after handling a frame.
enum Flow {
    Continue,
    Stop,
}

impl GatewayListener {
    /// Create a listener that forwards events into `tx`.
    pub fn new(config: GatewayConfig, tx: mpsc::Sender<ListenerEvent>) -> Self {
        Self { config, tx }
    }

    /// Connect and relay events until cancelled or the session ends.
    #[instrument(skip_all, fields(url = %self.config.url))]
    pub async fn run(self, cancel: CancellationToken) -> Result<(), GatewayError> {
        let (ws, _) = tokio::select! {
            () = cancel.cancelled() => return Ok(()),
            res = connect_async(self.config.url.as_str()) => {
                res.map_err(|e| GatewayError::Connect(e.to_string()))?
            }
        };
        info!("gateway connected");
        metrics::counter!("gateway_connections_total").increment(1);

        let (mut sink, mut stream) = ws.split();
        let mut state = SessionState::default();

        loop {
            let outgoing = tokio::select! {
                () = cancel.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    info!("gateway listener cancelled");
                    return Ok(());
                }
                () = next_beat(state.heartbeat.as_mut()) => {
                    if state.awaiting_ack {
                        return Err(GatewayError::HeartbeatTimeout);
                    }
                    state.awaiting_ack = true;
                    vec![protocol::heartbeat_payload(state.seq)]
                }
                frame = stream.next() => {
                    let Some(frame) = frame else {
                        return Err(GatewayError::Closed {
                            code: 1006,
                            reason: "connection dropped".into(),
                        });
                    };
                    let frame = frame.map_err(|e| GatewayError::Transport(e.to_string()))?;
                    let text = match frame {
                        Message::Text(text) => text,
                        Message::Close(close) => {
                            let (code, reason) = close
                                .map(|c| (u16::from(c.code), c.reason.as_str().to_owned()))
                                .unwrap_or((1005, String::new()));
                            return Err(GatewayError::from_close(code, &reason));
                        }
                        _ => continue,
                    };
                    let payload = protocol::parse_payload(text.as_str())?;
                    let mut outgoing = Vec::new();
                    match self.handle_payload(payload, &mut state, &mut outgoing).await? {
                        Flow::Continue => outgoing,
                        Flow::Stop => return Ok(()),
                    }
                }
            };

            for payload in outgoing {
                sink.send(Message::Text(payload.to_string().into()))
                    .await
                    .map_err(|e| GatewayError::Transport(e.to_string()))?;
            }
        }
    }

    async fn handle_payload(
        &self,
        payload: GatewayPayload,
        state: &mut SessionState,
        outgoing: &mut Vec<Value>,
    ) -> Result<Flow, GatewayError> {
        if let Some(seq) = payload.s {
            state.seq = Some(seq);
        }

        match payload.op {
            op::HELLO => {
                let interval_ms = protocol::hello_interval_ms(&payload)?;
                debug!(interval_ms, "gateway hello");
                state.heartbeat = Some(heartbeat_interval(Duration::from_millis(interval_ms)));
                outgoing.push(protocol::identify_payload(
                    &self.config.token,
                    self.config.intents,
                ));
            }
            op::HEARTBEAT => outgoing.push(protocol::heartbeat_payload(state.seq)),
            op::HEARTBEAT_ACK => state.awaiting_ack = false,
            op::RECONNECT => return Err(GatewayError::ReconnectRequested),
            op::INVALID_SESSION => return Err(GatewayError::InvalidSession),
            op::DISPATCH => return self.handle_dispatch(&payload).await,
            other => debug!(op = other, "ignoring gateway opcode"),
        }
        Ok(Flow::Continue)
    }

    async fn handle_dispatch(&self, payload: &GatewayPayload) -> Result<Flow, GatewayError> {
        let event = match payload.t.as_deref() {
            Some("READY") => {
                let (user_id, username) = protocol::ready_user(&payload.d)?;
                info!(user_id, %username, "gateway ready");
                ListenerEvent::Ready { user_id, username }
            }
            Some("MESSAGE_CREATE") => match protocol::message_from_dispatch(&payload.d) {
                Ok(event) => ListenerEvent::Message(event),
                Err(e) => {
                    warn!(error = %e, "skipping malformed MESSAGE_CREATE");
                    return Ok(Flow::Continue);
                }
            },
            _ => return Ok(Flow::Continue),
        };

        if self.tx.send(event).await.is_err() {
            debug!("listener receiver dropped, stopping");
            return Ok(Flow::Stop);
        }
        Ok(Flow::Continue)
    }
}

fn heartbeat_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn next_beat(heartbeat: Option<&mut Interval>) {
    match heartbeat {
        Some(interval) => {
            let _ = interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
