//! Exclusive access to the generation capability

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

/// Serializes work against a resource that cannot run two requests at once
///
/// Callers wait in arrival order (the underlying tokio mutex is fair) and
/// the lock is released when the closure's future completes, errors, or
/// unwinds.
#[derive(Debug, Default)]
pub struct ExclusiveAccess {
    gate: Mutex<()>,
    waiting: AtomicUsize,
}

impl ExclusiveAccess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the resource
    pub async fn with_exclusive_access<F, Fut, T>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let queued = self.waiting.fetch_add(1, Ordering::SeqCst);
        if queued > 0 {
            debug!("Generation capability busy, {} request(s) ahead", queued);
        }
        let queue_slot = QueueSlot(&self.waiting);
        let _guard = self.gate.lock().await;
        drop(queue_slot);
        f().await
    }

    /// Callers currently queued behind the holder
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }
}

/// Leaves the wait queue on drop, including when the waiting future is cancelled
struct QueueSlot<'a>(&'a AtomicUsize);

impl Drop for QueueSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
