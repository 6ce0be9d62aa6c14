//! Runtime Pool
//!
//! Runs jobs on a tokio runtime's blocking thread pool, optionally bounded
//! by a semaphore.

use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;

use super::{Job, WorkerPool};
use crate::error::PoolError;

/// Pool backed by `tokio::task::spawn_blocking`.
///
/// Admission order among queued jobs follows semaphore fairness and is
/// best-effort; use `FixedThreadPool` when strict FIFO matters.
pub struct RuntimePool {
    /// Runtime the jobs are spawned on
    handle: Handle,
    /// Concurrency limit (None = unbounded)
    semaphore: Option<Arc<Semaphore>>,
    /// Maximum concurrent jobs
    max_concurrent: Option<usize>,
    closed: AtomicBool,
}

impl RuntimePool {
    /// Unbounded pool on the given runtime
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            semaphore: None,
            max_concurrent: None,
            closed: AtomicBool::new(false),
        }
    }

    /// Pool running at most `max_concurrent` jobs at once
    pub fn with_limit(handle: Handle, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            handle,
            semaphore: Some(Arc::new(Semaphore::new(max_concurrent))),
            max_concurrent: Some(max_concurrent),
            closed: AtomicBool::new(false),
        }
    }

    /// Unbounded pool on the runtime of the calling context
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    /// Number of free slots (None if unbounded)
    pub fn available_slots(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|s| s.available_permits())
    }
}

impl WorkerPool for RuntimePool {
    fn execute(&self, job: Job) -> Result<(), PoolError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(PoolError::Closed);
        }

        let semaphore = self.semaphore.clone();
        self.handle.spawn(async move {
            // Permit is held until the blocking job returns
            let _permit = match semaphore {
                Some(semaphore) => match semaphore.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(e) => {
                        warn!("Runtime pool failed to acquire a slot: {}", e);
                        return;
                    }
                },
                None => None,
            };

            if let Err(e) = tokio::task::spawn_blocking(job).await {
                warn!("Runtime pool job did not complete: {}", e);
            }
        });
        Ok(())
    }

    fn shutdown(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("Runtime pool closed to new jobs");
        }
    }

    fn capacity(&self) -> Option<usize> {
        self.max_concurrent
    }
}
