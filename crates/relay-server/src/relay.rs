//! The relay hub.
//!
//! Owns the message cache, the session registry, and the outbound webhook,
//! and fans inbound messages out through the session [`Fanout`].
//!
//! Locks, in the only order they are ever taken:
//! 1. `buffer` (tokio mutex): held across append + broadcast and across
//!    backfill + registration, so a new session sees every cached message
//!    exactly once before any later broadcast.
//! 2. the fanout's session map.
//!
//! `registry` is a separate short-lived lock never held with either of the
//! above. The webhook POST runs with no lock held.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::Utc;
use metrics::{counter, gauge, histogram};
use parking_lot::Mutex as SyncMutex;
use relay_core::{
    CachedMessage, InboundEvent, MessageBuffer, RelayError, ServerEvent, SessionId,
    SessionRegistry, WebhookClient, WebhookPayload,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::metrics as m;
use crate::websocket::fanout::Fanout;
use crate::websocket::connection::ClientConnection;

/// State of the inbound gateway listener, as reported by `/health`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenerStatus {
    /// No bot token configured.
    Disabled,
    /// Connecting or identifying.
    Connecting,
    /// `READY` received.
    Connected,
    /// The listener stopped with an error.
    Failed,
}

/// Why an inbound event was not relayed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Discarded {
    /// Posted in a channel other than the configured one.
    OtherChannel,
    /// Authored by the relay's own bot user.
    OwnMessage,
}

/// The relay hub. Shared by `Arc` between the server and the listener bridge.
pub struct Relay {
    buffer: Mutex<MessageBuffer>,
    registry: SyncMutex<SessionRegistry>,
    fanout: Fanout,
    webhook: Arc<dyn WebhookClient>,
    channel_id: u64,
    /// Bot user ID from `READY`; 0 until known.
    self_id: AtomicU64,
    listener: SyncMutex<ListenerStatus>,
}

impl Relay {
    /// Create a hub relaying `channel_id` and posting through `webhook`.
    pub fn new(webhook: Arc<dyn WebhookClient>, channel_id: u64) -> Self {
        Self::with_buffer(webhook, channel_id, MessageBuffer::new())
    }

    /// Create a hub with a custom cache.
    pub fn with_buffer(
        webhook: Arc<dyn WebhookClient>,
        channel_id: u64,
        buffer: MessageBuffer,
    ) -> Self {
        Self {
            buffer: Mutex::new(buffer),
            registry: SyncMutex::new(SessionRegistry::new()),
            fanout: Fanout::new(),
            webhook,
            channel_id,
            self_id: AtomicU64::new(0),
            listener: SyncMutex::new(ListenerStatus::Disabled),
        }
    }

    /// Sessions receiving live broadcasts.
    pub fn fanout(&self) -> &Fanout {
        &self.fanout
    }

    /// Channel whose messages are relayed.
    pub fn channel_id(&self) -> u64 {
        self.channel_id
    }

    // ── Inbound ─────────────────────────────────────────────────────────

    /// Record the relay's own platform identity so its messages are not
    /// echoed back.
    pub fn set_identity(&self, user_id: u64) {
        self.self_id.store(user_id, Ordering::Relaxed);
    }

    /// The relay's own platform identity, once known.
    pub fn identity(&self) -> Option<u64> {
        match self.self_id.load(Ordering::Relaxed) {
            0 => None,
            id => Some(id),
        }
    }

    /// Cache an inbound message and broadcast it to every live session.
    ///
    /// Events from other channels or from the relay's own identity are
    /// dropped with no side effect.
    #[instrument(skip_all, fields(channel_id = event.channel_id, author_id = event.author_id))]
    pub async fn on_inbound_event(&self, event: InboundEvent) -> Result<usize, Discarded> {
        if event.channel_id != self.channel_id {
            counter!(m::INBOUND_DISCARDED_TOTAL, "reason" => "other_channel").increment(1);
            return Err(Discarded::OtherChannel);
        }
        if self.identity() == Some(event.author_id) {
            counter!(m::INBOUND_DISCARDED_TOTAL, "reason" => "own_message").increment(1);
            return Err(Discarded::OwnMessage);
        }

        let message = CachedMessage::from(event);
        let broadcast_event = ServerEvent::DiscordMessage(message.clone());

        let mut buffer = self.buffer.lock().await;
        if let Some(evicted) = buffer.push(message) {
            debug!(evicted_at = %evicted.timestamp, "cache full, evicted oldest");
        }
        #[allow(clippy::cast_precision_loss)]
        gauge!(m::CACHE_MESSAGES).set(buffer.len() as f64);
        let delivered = self.fanout.send_all(&broadcast_event).await;
        drop(buffer);

        counter!(m::INBOUND_ACCEPTED_TOTAL).increment(1);
        debug!(delivered, "relayed inbound message");
        Ok(delivered)
    }

    // ── Sessions ────────────────────────────────────────────────────────

    /// Send the cached history to a new session, oldest first, and register
    /// it for live broadcast.
    ///
    /// Calling it again for the same connection re-sends the same backfill.
    /// Returns the number of messages queued.
    #[instrument(skip_all, fields(session_id = %connection.id))]
    pub async fn on_session_connect(&self, connection: Arc<ClientConnection>) -> usize {
        let buffer = self.buffer.lock().await;
        let mut queued = 0;
        for message in buffer.iter() {
            if connection.send_event(&ServerEvent::DiscordMessage(message.clone())) {
                queued += 1;
            }
        }
        self.fanout.insert(connection).await;
        drop(buffer);

        debug!(backfill = queued, "session registered");
        queued
    }

    /// Forget a session's name and stop broadcasting to it.
    pub async fn on_session_disconnect(&self, session_id: &SessionId) {
        let _ = self.registry.lock().remove(session_id);
        let _ = self.fanout.remove(session_id).await;
    }

    /// Register (or replace) a session's display name.
    ///
    /// Returns the `username_set` event for the requesting session.
    pub fn set_display_name(&self, session_id: &SessionId, requested: Option<&str>) -> ServerEvent {
        let username = self.registry.lock().set_name(session_id.clone(), requested);
        debug!(session_id = %session_id, %username, "display name set");
        ServerEvent::UsernameSet { username }
    }

    /// Current display name of a session.
    pub fn display_name(&self, session_id: &SessionId) -> Option<String> {
        self.registry.lock().name_of(session_id).map(ToOwned::to_owned)
    }

    // ── Outbound ────────────────────────────────────────────────────────

    /// Post a session's message to the webhook.
    ///
    /// - unnamed session: [`RelayError::Unauthenticated`], no network call
    /// - blank text: `Ok(None)`, no network call
    /// - delivered: `Ok(Some(message_sent))` for the sender only
    ///
    /// Sent messages are neither cached nor broadcast.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn send_outbound(
        &self,
        session_id: &SessionId,
        text: &str,
    ) -> Result<Option<ServerEvent>, RelayError> {
        let Some(username) = self.display_name(session_id) else {
            counter!(m::OUTBOUND_FAILED_TOTAL, "code" => RelayError::Unauthenticated.code())
                .increment(1);
            return Err(RelayError::Unauthenticated);
        };

        let content = text.trim();
        if content.is_empty() {
            return Ok(None);
        }

        let payload = WebhookPayload::from_web_user(&username, content);
        let started = Instant::now();
        let result = self.webhook.post(&payload).await;
        histogram!(m::WEBHOOK_REQUEST_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

        if let Err(e) = result {
            warn!(error = %e, "webhook delivery failed");
            counter!(m::OUTBOUND_FAILED_TOTAL, "code" => e.code()).increment(1);
            return Err(e);
        }

        counter!(m::OUTBOUND_SENT_TOTAL).increment(1);
        info!(%username, "outbound message delivered");
        Ok(Some(ServerEvent::MessageSent {
            username,
            content: content.to_owned(),
            timestamp: Utc::now(),
        }))
    }

    // ── Status ──────────────────────────────────────────────────────────

    /// Current listener state.
    pub fn listener_status(&self) -> ListenerStatus {
        *self.listener.lock()
    }

    /// Update the listener state.
    pub fn set_listener_status(&self, status: ListenerStatus) {
        *self.listener.lock() = status;
    }

    /// Sessions that have registered a name.
    pub fn named_sessions(&self) -> usize {
        self.registry.lock().len()
    }

    /// Messages currently cached.
    pub async fn cached_messages(&self) -> usize {
        self.buffer.lock().await.len()
    }

    /// Copy of the cache, oldest first.
    pub async fn cached_snapshot(&self) -> Vec<CachedMessage> {
        self.buffer.lock().await.snapshot()
    }

    /// Live connections.
    pub async fn connection_count(&self) -> usize {
        self.fanout.len().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::CountingWebhook;
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use relay_core::MAX_CACHE_SIZE;
    use tokio::sync::mpsc;

    const CHANNEL: u64 = 4242;
    const BOT: u64 = 999;

    fn relay_with(webhook: Arc<CountingWebhook>) -> Relay {
        let relay = Relay::new(webhook, CHANNEL);
        relay.set_identity(BOT);
        relay
    }

    fn relay() -> (Relay, Arc<CountingWebhook>) {
        let hook = Arc::new(CountingWebhook::default());
        (relay_with(hook.clone()), hook)
    }

    fn inbound(channel: u64, author: u64, content: &str) -> InboundEvent {
        InboundEvent {
            channel_id: channel,
            author_id: author,
            author_name: "alice".into(),
            author_avatar: None,
            content: content.into(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn session(id: &str) -> (Arc<ClientConnection>, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(256);
        (Arc::new(ClientConnection::new(SessionId::from(id), tx)), rx)
    }

    fn drain(rx: &mut mpsc::Receiver<Arc<String>>) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(serde_json::from_str(&msg).unwrap());
        }
        out
    }

    fn contents(frames: &[serde_json::Value]) -> Vec<String> {
        frames
            .iter()
            .map(|f| {
                assert_eq!(f["type"], "discord_message");
                f["data"]["content"].as_str().unwrap().to_owned()
            })
            .collect()
    }

    // ── inbound ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn accepted_event_is_cached_and_broadcast() {
        let (relay, _) = relay();
        let (c1, mut rx1) = session("s1");
        let (c2, mut rx2) = session("s2");
        let _ = relay.on_session_connect(c1).await;
        let _ = relay.on_session_connect(c2).await;

        assert_eq!(relay.on_inbound_event(inbound(CHANNEL, 7, "hello")).await, Ok(2));

        assert_eq!(contents(&drain(&mut rx1)), vec!["hello"]);
        assert_eq!(contents(&drain(&mut rx2)), vec!["hello"]);
        let cached = relay.cached_snapshot().await;
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].username, "alice");
        assert_eq!(cached[0].avatar_url, "");
    }

    #[tokio::test]
    async fn other_channel_is_discarded() {
        let (relay, _) = relay();
        let (c1, mut rx1) = session("s1");
        let _ = relay.on_session_connect(c1).await;

        assert_eq!(
            relay.on_inbound_event(inbound(1, 7, "elsewhere")).await,
            Err(Discarded::OtherChannel)
        );
        assert!(drain(&mut rx1).is_empty());
        assert_eq!(relay.cached_messages().await, 0);
    }

    #[tokio::test]
    async fn own_messages_are_discarded() {
        let (relay, _) = relay();
        assert_eq!(
            relay.on_inbound_event(inbound(CHANNEL, BOT, "echo")).await,
            Err(Discarded::OwnMessage)
        );
        assert_eq!(relay.cached_messages().await, 0);
    }

    #[tokio::test]
    async fn unknown_identity_filters_nothing() {
        let relay = Relay::new(Arc::new(CountingWebhook::default()), CHANNEL);
        assert_eq!(relay.identity(), None);
        assert!(relay.on_inbound_event(inbound(CHANNEL, BOT, "x")).await.is_ok());
    }

    #[tokio::test]
    async fn cache_keeps_newest_hundred() {
        let (relay, _) = relay();
        for i in 0..150 {
            let _ = relay
                .on_inbound_event(inbound(CHANNEL, 7, &format!("m{i}")))
                .await;
        }
        let cached = relay.cached_snapshot().await;
        assert_eq!(cached.len(), 100);
        assert_eq!(cached[0].content, "m50");
        assert_eq!(cached[99].content, "m149");
    }

    #[tokio::test]
    async fn failed_session_does_not_block_broadcast() {
        let (relay, _) = relay();
        let (dead, dead_rx) = session("dead");
        let (live, mut live_rx) = session("live");
        let _ = relay.on_session_connect(dead).await;
        let _ = relay.on_session_connect(live).await;
        drop(dead_rx);

        assert_eq!(relay.on_inbound_event(inbound(CHANNEL, 7, "still")).await, Ok(1));
        assert_eq!(contents(&drain(&mut live_rx)), vec!["still"]);
        assert_eq!(relay.cached_messages().await, 1);
    }

    // ── connect / disconnect ────────────────────────────────────────

    #[tokio::test]
    async fn connect_backfills_oldest_first() {
        let (relay, _) = relay();
        for text in ["a", "b", "c"] {
            let _ = relay.on_inbound_event(inbound(CHANNEL, 7, text)).await;
        }
        let (conn, mut rx) = session("late");
        assert_eq!(relay.on_session_connect(conn.clone()).await, 3);
        assert_eq!(contents(&drain(&mut rx)), vec!["a", "b", "c"]);

        // Reconnecting re-sends the same history.
        assert_eq!(relay.on_session_connect(conn).await, 3);
        assert_eq!(contents(&drain(&mut rx)), vec!["a", "b", "c"]);
        assert_eq!(relay.connection_count().await, 1);
    }

    #[tokio::test]
    async fn full_cache_backfills_at_smallest_outbox() {
        let (relay, _) = relay();
        for i in 0..MAX_CACHE_SIZE + 20 {
            let _ = relay
                .on_inbound_event(inbound(CHANNEL, 7, &format!("m{i}")))
                .await;
        }
        let (tx, mut rx) = mpsc::channel(MAX_CACHE_SIZE);
        let conn = Arc::new(ClientConnection::new(SessionId::from("late"), tx));

        assert_eq!(relay.on_session_connect(conn.clone()).await, MAX_CACHE_SIZE);
        let got = contents(&drain(&mut rx));
        assert_eq!(got.len(), MAX_CACHE_SIZE);
        assert_eq!(got[0], "m20");
        assert_eq!(got[MAX_CACHE_SIZE - 1], format!("m{}", MAX_CACHE_SIZE + 19));
        assert_eq!(conn.dropped(), 0);
    }

    #[tokio::test]
    async fn connect_with_empty_cache_sends_nothing() {
        let (relay, _) = relay();
        let (conn, mut rx) = session("s1");
        assert_eq!(relay.on_session_connect(conn).await, 0);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn backfill_then_live_without_gap_or_duplicate() {
        let relay = Arc::new(relay().0);
        let writer = {
            let relay = Arc::clone(&relay);
            tokio::spawn(async move {
                for i in 0..50 {
                    let _ = relay
                        .on_inbound_event(inbound(CHANNEL, 7, &format!("m{i}")))
                        .await;
                    tokio::task::yield_now().await;
                }
            })
        };
        tokio::task::yield_now().await;
        let (conn, mut rx) = session("racer");
        let _ = relay.on_session_connect(conn).await;
        writer.await.unwrap();

        let seen = contents(&drain(&mut rx));
        let expected: Vec<String> = (0..50).map(|i| format!("m{i}")).collect();
        let start = expected.len() - seen.len();
        assert_eq!(seen, expected[start..].to_vec());
    }

    #[tokio::test]
    async fn disconnect_clears_name_and_connection() {
        let (relay, _) = relay();
        let (conn, _rx) = session("s1");
        let id = conn.id.clone();
        let _ = relay.on_session_connect(conn).await;
        let _ = relay.set_display_name(&id, Some("bob"));

        relay.on_session_disconnect(&id).await;
        assert_eq!(relay.named_sessions(), 0);
        assert_eq!(relay.connection_count().await, 0);
        assert_matches!(
            relay.send_outbound(&id, "hi").await,
            Err(RelayError::Unauthenticated)
        );
    }

    #[tokio::test]
    async fn disconnect_leaves_cache_untouched() {
        let (relay, _) = relay();
        let _ = relay.on_inbound_event(inbound(CHANNEL, 7, "keep")).await;
        relay.on_session_disconnect(&SessionId::from("ghost")).await;
        assert_eq!(relay.cached_messages().await, 1);
    }

    // ── names ───────────────────────────────────────────────────────

    #[test]
    fn set_display_name_keeps_name_and_defaults_missing() {
        let (relay, _) = relay();
        let id = SessionId::from("s1");
        assert_eq!(
            relay.set_display_name(&id, Some("  bob  ")),
            ServerEvent::UsernameSet {
                username: "  bob  ".into()
            }
        );
        assert_eq!(
            relay.set_display_name(&id, None),
            ServerEvent::UsernameSet {
                username: "Anonymous".into()
            }
        );
        assert_eq!(relay.display_name(&id).as_deref(), Some("Anonymous"));
        assert_eq!(relay.named_sessions(), 1);
    }

    // ── outbound ────────────────────────────────────────────────────

    #[tokio::test]
    async fn unnamed_session_is_unauthenticated_without_network() {
        let (relay, hook) = relay();
        let result = relay.send_outbound(&SessionId::from("s1"), "hi").await;
        assert_eq!(result, Err(RelayError::Unauthenticated));
        assert_eq!(hook.calls(), 0);
    }

    #[tokio::test]
    async fn blank_text_is_silent_noop() {
        let (relay, hook) = relay();
        let id = SessionId::from("s1");
        let _ = relay.set_display_name(&id, Some("bob"));
        assert_eq!(relay.send_outbound(&id, "   \n").await, Ok(None));
        assert_eq!(hook.calls(), 0);
    }

    #[tokio::test]
    async fn anonymous_send_posts_labelled_payload() {
        let (relay, hook) = relay();
        let id = SessionId::from("s1");
        let _ = relay.set_display_name(&id, Some(""));

        let reply = relay.send_outbound(&id, "  hi  ").await.unwrap().unwrap();
        assert_matches!(
            reply,
            ServerEvent::MessageSent { ref username, ref content, .. }
                if username == "Anonymous" && content == "hi"
        );
        assert_eq!(hook.calls(), 1);
        assert_eq!(
            hook.payloads.lock()[0],
            WebhookPayload {
                content: "hi".into(),
                username: "Web User: Anonymous".into()
            }
        );
    }

    #[tokio::test]
    async fn sent_messages_are_not_cached_or_broadcast() {
        let (relay, _) = relay();
        let (other, mut other_rx) = session("other");
        let _ = relay.on_session_connect(other).await;
        let id = SessionId::from("s1");
        let _ = relay.set_display_name(&id, Some("bob"));

        let _ = relay.send_outbound(&id, "hello").await.unwrap();
        assert_eq!(relay.cached_messages().await, 0);
        assert!(drain(&mut other_rx).is_empty());
    }

    #[tokio::test]
    async fn delivery_failure_is_reported() {
        let hook = Arc::new(CountingWebhook::failing("webhook returned HTTP 500"));
        let relay = relay_with(hook.clone());
        let id = SessionId::from("s1");
        let _ = relay.set_display_name(&id, Some("bob"));

        let err = relay.send_outbound(&id, "hi").await.unwrap_err();
        assert_eq!(
            ServerEvent::from(&err),
            ServerEvent::error("Failed to send message: webhook returned HTTP 500")
        );
        assert_eq!(hook.calls(), 1);
        assert_eq!(relay.cached_messages().await, 0);
    }

    // ── status ──────────────────────────────────────────────────────

    #[test]
    fn listener_status_round_trip() {
        let (relay, _) = relay();
        assert_eq!(relay.listener_status(), ListenerStatus::Disabled);
        relay.set_listener_status(ListenerStatus::Connected);
        assert_eq!(relay.listener_status(), ListenerStatus::Connected);
        assert_eq!(
            serde_json::to_value(ListenerStatus::Failed).unwrap(),
            serde_json::json!("failed")
        );
    }
}
