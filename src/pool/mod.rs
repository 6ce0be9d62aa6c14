//! Worker Pools
//!
//! Concurrency providers that run task bodies off the coordinator thread.

pub mod fixed;
pub mod runtime;

pub use fixed::FixedThreadPool;
pub use runtime::RuntimePool;

use crate::error::PoolError;

/// Unit of work handed to a pool
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Anything that can run a unit of work asynchronously
pub trait WorkerPool: Send + Sync {
    /// Run `job` on an available thread; must not block the caller
    fn execute(&self, job: Job) -> Result<(), PoolError>;

    /// Stop accepting work and let queued work drain
    fn shutdown(&self) {}

    /// Maximum number of jobs running at once (`None` if unbounded)
    fn capacity(&self) -> Option<usize> {
        None
    }
}
