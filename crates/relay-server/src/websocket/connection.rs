//! Per-session outbox and liveness tracking.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use relay_core::{ServerEvent, SessionId};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::metrics as m;

/// A connected browser session as seen by the hub.
///
/// Frames are queued on a bounded outbox drained by the session's writer
/// task. Queuing never waits: a full or closed outbox drops the frame and
/// bumps [`ClientConnection::dropped`].
pub struct ClientConnection {
    /// Session ID, assigned on upgrade.
    pub id: SessionId,
    outbox: mpsc::Sender<Arc<String>>,
    opened: Instant,
    last_seen: Mutex<Instant>,
    dropped: AtomicU64,
}

impl ClientConnection {
    /// Wrap the sending half of a session's outbox.
    pub fn new(id: SessionId, outbox: mpsc::Sender<Arc<String>>) -> Self {
        let now = Instant::now();
        Self {
            id,
            outbox,
            opened: now,
            last_seen: Mutex::new(now),
            dropped: AtomicU64::new(0),
        }
    }

    /// Queue an already-serialized frame. Returns whether it was queued.
    pub fn send(&self, frame: Arc<String>) -> bool {
        let reason = match self.outbox.try_send(frame) {
            Ok(()) => return true,
            Err(TrySendError::Full(_)) => "full",
            Err(TrySendError::Closed(_)) => "closed",
        };
        let _ = self.dropped.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(m::WS_BROADCAST_DROPS_TOTAL).increment(1);
        debug!(session_id = %self.id, reason, "outbox rejected frame");
        false
    }

    /// Serialize an event into its envelope and queue it.
    pub fn send_event(&self, event: &ServerEvent) -> bool {
        match event.to_json() {
            Ok(json) => self.send(Arc::new(json)),
            Err(e) => {
                warn!(session_id = %self.id, event_type = event.event_type(), error = %e, "event serialization failed");
                false
            }
        }
    }

    /// Frames dropped so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Record activity from the client (any frame, including pongs).
    pub fn touch(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    /// Time since the client was last heard from.
    pub fn idle_for(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }

    /// Time since the upgrade.
    pub fn age(&self) -> Duration {
        self.opened.elapsed()
    }
}
