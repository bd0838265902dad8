//! Process-wide stop signal plus the background tasks to wait for.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long [`ShutdownCoordinator::drain`] waits when no grace period is given.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(10);

/// Owns the cancellation token every long-lived task watches and the
/// handles of the tasks the process must wait for before exiting.
///
/// Sessions get child tokens; the HTTP server and the gateway listener are
/// tracked so [`drain`](Self::drain) can wait for them.
#[derive(Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ShutdownCoordinator {
    /// Create a coordinator with nothing tracked.
    pub fn new() -> Self {
        Self::default()
    }

    /// Token cancelled when shutdown starts.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Signal every task to stop. Idempotent.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether shutdown has started.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait for `handle` during [`drain`](Self::drain).
    pub fn track(&self, handle: JoinHandle<()>) {
        self.tasks.lock().push(handle);
    }

    /// Signal shutdown, then wait up to `grace` for tracked tasks.
    ///
    /// Tasks still running at the deadline are aborted. Returns how many
    /// finished on their own.
    pub async fn drain(&self, grace: Option<Duration>) -> usize {
        let grace = grace.unwrap_or(DEFAULT_GRACE);
        self.shutdown();

        let tasks = std::mem::take(&mut *self.tasks.lock());
        info!(tasks = tasks.len(), ?grace, "draining background tasks");

        let deadline = Instant::now() + grace;
        let mut finished = 0;
        for mut task in tasks {
            if tokio::time::timeout_at(deadline, &mut task).await.is_ok() {
                finished += 1;
            } else {
                warn!("task still running at shutdown deadline, aborting");
                task.abort();
            }
        }
        finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_running() {
        let coord = ShutdownCoordinator::new();
        assert!(!coord.is_shutting_down());
        assert!(!coord.token().is_cancelled());
    }

    #[test]
    fn shutdown_reaches_every_token() {
        let coord = ShutdownCoordinator::new();
        let parent = coord.token();
        let child = parent.child_token();
        coord.shutdown();
        coord.shutdown();
        assert!(parent.is_cancelled());
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn drain_waits_for_cooperative_tasks() {
        let coord = ShutdownCoordinator::new();
        for _ in 0..3 {
            let token = coord.token();
            coord.track(tokio::spawn(async move { token.cancelled().await }));
        }
        assert_eq!(coord.drain(None).await, 3);
        assert!(coord.is_shutting_down());
    }

    #[tokio::test(start_paused = true)]
    async fn drain_aborts_stragglers_at_deadline() {
        let coord = ShutdownCoordinator::new();
        let token = coord.token();
        coord.track(tokio::spawn(async move { token.cancelled().await }));
        coord.track(tokio::spawn(tokio::time::sleep(Duration::from_secs(600))));

        assert_eq!(coord.drain(Some(Duration::from_millis(50))).await, 1);
    }

    #[tokio::test]
    async fn drain_with_nothing_tracked() {
        assert_eq!(ShutdownCoordinator::default().drain(None).await, 0);
    }
}
