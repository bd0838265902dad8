//! Live session set used for broadcast.

use std::collections::HashMap;
use std::sync::Arc;

use relay_core::{ServerEvent, SessionId};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::connection::ClientConnection;

/// Connections that receive every relayed message.
///
/// An event is serialized once and the same frame is queued on every
/// outbox. Queuing never waits, so one stuck session cannot hold up the rest.
#[derive(Default)]
pub struct Fanout {
    sessions: RwLock<HashMap<SessionId, Arc<ClientConnection>>>,
}

impl Fanout {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start delivering to a connection, replacing any entry with its ID.
    pub async fn insert(&self, connection: Arc<ClientConnection>) {
        let _ = self
            .sessions
            .write()
            .await
            .insert(connection.id.clone(), connection);
    }

    /// Stop delivering to a session.
    pub async fn remove(&self, session_id: &SessionId) -> Option<Arc<ClientConnection>> {
        self.sessions.write().await.remove(session_id)
    }

    /// Whether a session is receiving broadcasts.
    pub async fn contains(&self, session_id: &SessionId) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    /// Queue `event` for every session. Returns how many accepted it.
    pub async fn send_all(&self, event: &ServerEvent) -> usize {
        let frame = match event.to_json() {
            Ok(json) => Arc::new(json),
            Err(e) => {
                warn!(event_type = event.event_type(), error = %e, "event serialization failed");
                return 0;
            }
        };

        let sessions = self.sessions.read().await;
        let delivered = sessions
            .values()
            .filter(|conn| conn.send(Arc::clone(&frame)))
            .count();
        if delivered < sessions.len() {
            warn!(
                event_type = event.event_type(),
                skipped = sessions.len() - delivered,
                "some sessions missed a broadcast"
            );
        }
        debug!(event_type = event.event_type(), delivered, "broadcast");
        delivered
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no session is connected.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
