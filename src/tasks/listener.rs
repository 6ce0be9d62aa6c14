//! Task Listeners
//!
//! External callback surface and the internal binding used by the coordinator.

use std::sync::Arc;

use crate::error::TaskError;

use super::task::Task;

/// Outcome listener for a task.
///
/// Callbacks are delivered through the coordinator, one at a time and in
/// lifecycle order for any single task. Every method defaults to a no-op.
pub trait TaskListener<K, R>: Send + Sync {
    /// The body started running on a pool thread
    fn on_start(&self, _key: &K) {}

    /// The body returned a result
    fn on_success(&self, _key: &K, _result: &R) {}

    /// The body failed or panicked
    fn on_failed(&self, _key: &K, _error: &TaskError) {}

    /// The task was canceled, either while waiting or by the body itself
    fn on_canceled(&self, _key: &K) {}
}

/// Notification sink bound to a task at submission.
///
/// Called from pool threads; implementations forward into the coordinator mailbox.
pub(crate) trait InternalListener<K, R>: Send + Sync {
    fn on_start(&self, task: &Arc<Task<K, R>>);

    fn on_success(&self, task: &Arc<Task<K, R>>, result: R);

    fn on_failed(&self, task: &Arc<Task<K, R>>, error: TaskError);

    fn on_canceled(&self, task: &Arc<Task<K, R>>);
}
