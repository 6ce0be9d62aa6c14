//! Fixed Thread Pool
//!
//! N named OS threads draining a single FIFO job channel.

use log::{debug, info};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;

use super::{Job, WorkerPool};
use crate::error::PoolError;

/// Fixed-size pool with strict FIFO admission
pub struct FixedThreadPool {
    /// Job sender, taken on shutdown
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    /// Worker thread handles
    workers: Mutex<Vec<JoinHandle<()>>>,
    /// Number of worker threads
    size: usize,
}

impl FixedThreadPool {
    /// Create a pool with `size` workers (at least one)
    pub fn new(size: usize) -> Result<Self, PoolError> {
        Self::with_name(size, "task-worker")
    }

    /// Create a pool whose threads are named `{prefix}-{index}`
    pub fn with_name(size: usize, prefix: &str) -> Result<Self, PoolError> {
        let size = size.max(1);
        let (sender, receiver) = mpsc::unbounded_channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = Vec::with_capacity(size);
        for index in 0..size {
            let receiver = receiver.clone();
            let handle = std::thread::Builder::new()
                .name(format!("{}-{}", prefix, index))
                .spawn(move || worker_loop(index, receiver))?;
            workers.push(handle);
        }

        info!("Started fixed pool with {} workers", size);
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            size,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_shutdown(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Wait for every worker to exit; only returns after `shutdown`
    pub fn join(&self) {
        let workers: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        for handle in workers {
            let _ = handle.join();
        }
    }
}

fn worker_loop(index: usize, receiver: Arc<Mutex<mpsc::UnboundedReceiver<Job>>>) {
    loop {
        // Lock is released before the job runs.
        let job = receiver.lock().blocking_recv();
        match job {
            Some(job) => job(),
            None => break,
        }
    }
    debug!("Worker {} exiting", index);
}

impl WorkerPool for FixedThreadPool {
    fn execute(&self, job: Job) -> Result<(), PoolError> {
        let sender = self.sender.lock();
        match sender.as_ref() {
            Some(tx) => tx.send(job).map_err(|_| PoolError::Closed),
            None => Err(PoolError::Closed),
        }
    }

    fn shutdown(&self) {
        if self.sender.lock().take().is_some() {
            info!("Fixed pool shutting down, draining queued jobs");
        }
    }

    fn capacity(&self) -> Option<usize> {
        Some(self.size)
    }
}

impl Drop for FixedThreadPool {
    fn drop(&mut self) {
        self.sender.get_mut().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_runs_jobs_in_fifo_order() {
        let pool = FixedThreadPool::new(1).unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let order = order.clone();
            pool.execute(Box::new(move || order.lock().push(i))).unwrap();
        }

        pool.shutdown();
        pool.join();
        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_bounded_concurrency() {
        let pool = FixedThreadPool::new(2).unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..6 {
            let running = running.clone();
            let peak = peak.clone();
            pool.execute(Box::new(move || {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(20));
                running.fetch_sub(1, Ordering::SeqCst);
            }))
            .unwrap();
        }

        pool.shutdown();
        pool.join();
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.capacity(), Some(2));
    }

    #[test]
    fn test_execute_after_shutdown() {
        let pool = FixedThreadPool::new(1).unwrap();
        pool.shutdown();
        assert!(pool.is_shutdown());
        let result = pool.execute(Box::new(|| {}));
        assert!(matches!(result, Err(PoolError::Closed)));
        pool.join();
    }

    #[test]
    fn test_zero_size_clamped() {
        let pool = FixedThreadPool::new(0).unwrap();
        assert_eq!(pool.size(), 1);
    }
}
