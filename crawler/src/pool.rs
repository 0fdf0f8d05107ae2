//! Bounded worker pool shared by every crawl run.
//!
//! Worker slots are semaphore permits taken by tasks around their fetch and
//! persist steps. Submitted runs are counted while alive so callers can wait
//! for the pool to become quiescent.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, AcquireError, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("worker pool is shut down")]
    ShutDown,
}

pub struct WorkerPool {
    slots: Arc<Semaphore>,
    size: usize,
    inflight: Arc<watch::Sender<usize>>,
    shut_down: AtomicBool,
}

/// Decrements the in-flight count when a submitted run ends, however it ends.
struct RunGuard(Arc<watch::Sender<usize>>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let (tx, _) = watch::channel(0usize);
        Self {
            slots: Arc::new(Semaphore::new(size)),
            size,
            inflight: Arc::new(tx),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Wait for a free worker slot; it is released when the permit drops.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, AcquireError> {
        self.slots.clone().acquire_owned().await
    }

    /// Spawn a run on the runtime and count it until it completes.
    pub fn submit<F>(&self, run: F) -> Result<JoinHandle<F::Output>, PoolError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        if self.is_shut_down() {
            return Err(PoolError::ShutDown);
        }
        self.inflight.send_modify(|n| *n += 1);
        let guard = RunGuard(self.inflight.clone());
        Ok(tokio::spawn(async move {
            let _guard = guard;
            run.await
        }))
    }

    pub fn in_flight(&self) -> usize {
        *self.inflight.borrow()
    }

    pub fn is_quiescent(&self) -> bool {
        self.in_flight() == 0
    }

    /// Refuse further submissions. Runs already submitted keep going.
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// True when the pool became quiescent within `timeout`.
    pub async fn await_quiescent(&self, timeout: Duration) -> bool {
        let mut rx = self.inflight.subscribe();
        let drained = tokio::time::timeout(timeout, rx.wait_for(|n| *n == 0)).await.is_ok();
        drained
    }
}
