//! Task Context
//!
//! Cooperative cancellation handed to task bodies.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::TaskError;

/// Shared cooperative cancel flag.
///
/// Setting the flag never interrupts a running body; the body must poll it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    canceled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation was requested
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }
}

/// Context passed to a task body while it runs
#[derive(Debug, Clone)]
pub struct TaskContext<K> {
    key: K,
    token: CancelToken,
}

impl<K> TaskContext<K> {
    pub(crate) fn new(key: K, token: CancelToken) -> Self {
        Self { key, token }
    }

    /// Key of the running task
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Check whether cancellation was requested
    pub fn is_canceled(&self) -> bool {
        self.token.is_canceled()
    }

    /// Return `Err(TaskError::Canceled)` once cancellation was requested.
    ///
    /// Meant for `?` at polling points inside a body loop.
    pub fn check_canceled(&self) -> Result<(), TaskError> {
        if self.token.is_canceled() {
            Err(TaskError::Canceled)
        } else {
            Ok(())
        }
    }

    /// Clone of the cancel token, for handing to helper threads
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }
}
