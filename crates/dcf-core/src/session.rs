use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

/// Lifecycle state of the single gateway session.
///
/// The ready flag is set once, when the remote handshake completes, and
/// observed through a watch channel so callers can await readiness without
/// polling. Closing is an idempotent latch and is valid at any point,
/// including before the session ever became ready.
pub struct SessionState {
    ready_tx: watch::Sender<bool>,
    closed: AtomicBool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        let (ready_tx, _) = watch::channel(false);
        Self {
            ready_tx,
            closed: AtomicBool::new(false),
        }
    }

    pub fn mark_ready(&self) {
        self.ready_tx.send_replace(true);
    }

    pub fn is_ready(&self) -> bool {
        *self.ready_tx.borrow()
    }

    /// Waits until the session is ready. Returns immediately if it already is.
    pub async fn wait_ready(&self) {
        let mut rx = self.ready_tx.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Latches the session closed. Returns `true` only on the first call.
    pub fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
