//! Process-wide bound on concurrent probes.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;

/// The pool's semaphore was closed.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("probe pool is closed")]
pub struct PoolClosed;

/// Clonable handle limiting how many probes run at once.
///
/// Every clone shares the same permits, so one pool created at start-up
/// bounds the resolver, the aggregator and the sync engine together.
#[derive(Debug, Clone)]
pub struct ProbePool {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl ProbePool {
    /// Create a pool admitting `capacity` concurrent probes (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Maximum number of concurrent probes.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held.
    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Wait for a permit, then drive `work` to completion while holding it.
    ///
    /// # Errors
    ///
    /// Returns [`PoolClosed`] if the semaphore was closed.
    pub async fn run<F>(&self, work: F) -> Result<F::Output, PoolClosed>
    where
        F: Future,
    {
        let _permit = self.permits.acquire().await.map_err(|_| PoolClosed)?;
        Ok(work.await)
    }
}
