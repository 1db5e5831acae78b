//! In-band shutdown control.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// Cloneable trigger shared by the router, the listeners and `main`.
///
/// A shutdown is first *requested* (the router stops serving new work) and
/// then *triggered* (listeners close and workers are stopped).
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
    requested: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            tx,
            requested: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn trigger(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.tx.send_replace(true);
    }

    /// Mark the shutdown as requested now and trigger after `delay`, giving
    /// the acknowledgement time to flush.
    pub fn trigger_after(&self, delay: Duration) {
        self.requested.store(true, Ordering::SeqCst);
        let handle = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::info!("Shutdown grace period elapsed, stopping gateway");
            handle.trigger();
        });
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// True once a shutdown has been requested, even before it triggers.
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Resolve once shutdown has been triggered.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|triggered| *triggered).await;
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}
