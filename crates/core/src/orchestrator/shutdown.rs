//! Cooperative stop signal shared by the orchestrator and its worker.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Clonable handle used to request a stop between targets.
///
/// A stop never interrupts a running fetch; it is observed between targets,
/// during pacing delays and during retry backoff.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request a stop. Idempotent.
    pub fn request_shutdown(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        *self.tx.borrow()
    }

    /// Sleep for `delay` unless a stop is requested first.
    ///
    /// Returns `true` if the full delay elapsed and no stop is pending.
    pub async fn pause(&self, delay: Duration) -> bool {
        let mut rx = self.tx.subscribe();
        if *rx.borrow_and_update() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => !self.is_shutdown_requested(),
            _ = rx.wait_for(|stop| *stop) => false,
        }
    }
}
