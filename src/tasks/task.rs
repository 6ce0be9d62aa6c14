//! Task Entity
//!
//! Keyed unit of work with a monotonic lifecycle and a cooperative cancel flag.

use chrono::{DateTime, Utc};
use log::{debug, error, warn};
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use crate::error::{TaskError, TransitionError};

use super::context::{CancelToken, TaskContext};
use super::listener::{InternalListener, TaskListener};
use super::types::{TaskBody, TaskInfo, TaskKey, TaskState};

#[derive(Debug, Default, Clone)]
struct Timing {
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

/// Keyed asynchronous unit of work.
///
/// State, result and failure cause are written only by the coordinator
/// thread; any thread may read them.
pub struct Task<K, R> {
    /// Caller supplied key, compared for equality only
    key: K,
    /// Current lifecycle state
    state: Mutex<TaskState>,
    /// Cooperative cancel flag shared with the running body
    token: CancelToken,
    /// Body, taken exactly once by the execution wrapper
    body: Mutex<Option<TaskBody<K, R>>>,
    /// External outcome listener
    listener: Option<Arc<dyn TaskListener<K, R>>>,
    /// Coordinator binding, set once at submission
    internal: OnceLock<Arc<dyn InternalListener<K, R>>>,
    /// Result (only on Succeeded)
    result: Mutex<Option<Arc<R>>>,
    /// Failure cause (only on Failed)
    error: Mutex<Option<Arc<TaskError>>>,
    created_at: DateTime<Utc>,
    timing: Mutex<Timing>,
}

impl<K: TaskKey, R: Send + Sync + 'static> Task<K, R> {
    /// Create a new task in the Created state
    pub fn new<F>(key: K, body: F) -> Self
    where
        F: FnOnce(&TaskContext<K>) -> Result<R, TaskError> + Send + 'static,
    {
        Self {
            key,
            state: Mutex::new(TaskState::Created),
            token: CancelToken::new(),
            body: Mutex::new(Some(Box::new(body))),
            listener: None,
            internal: OnceLock::new(),
            result: Mutex::new(None),
            error: Mutex::new(None),
            created_at: Utc::now(),
            timing: Mutex::new(Timing::default()),
        }
    }

    /// Set the outcome listener
    pub fn with_listener(self, listener: impl TaskListener<K, R> + 'static) -> Self {
        self.with_shared_listener(Arc::new(listener))
    }

    /// Set a listener shared with other tasks
    pub fn with_shared_listener(mut self, listener: Arc<dyn TaskListener<K, R>>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn state(&self) -> TaskState {
        *self.state.lock()
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// Request cooperative cancellation.
    ///
    /// Only sets the flag; a running body stops when it next polls.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.token.is_canceled()
    }

    /// Result, once the task succeeded
    pub fn result(&self) -> Option<Arc<R>> {
        self.result.lock().clone()
    }

    /// Failure cause, once the task failed
    pub fn error(&self) -> Option<Arc<TaskError>> {
        self.error.lock().clone()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.timing.lock().started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.timing.lock().finished_at
    }

    /// Get run duration in milliseconds (up to now if still executing)
    pub fn duration_ms(&self) -> Option<u64> {
        let timing = self.timing.lock().clone();
        let start = timing.started_at?;
        let end = timing.finished_at.unwrap_or_else(Utc::now);
        Some((end - start).num_milliseconds().max(0) as u64)
    }

    /// Serializable snapshot
    pub fn info(&self) -> TaskInfo<K> {
        let timing = self.timing.lock().clone();
        TaskInfo {
            key: self.key.clone(),
            state: self.state(),
            cancel_requested: self.is_cancel_requested(),
            error: self.error().map(|e| e.to_string()),
            created_at: self.created_at.to_rfc3339(),
            started_at: timing.started_at.map(|t| t.to_rfc3339()),
            finished_at: timing.finished_at.map(|t| t.to_rfc3339()),
            duration_ms: self.duration_ms(),
        }
    }

    pub(crate) fn listener(&self) -> Option<&Arc<dyn TaskListener<K, R>>> {
        self.listener.as_ref()
    }

    /// Apply a transition, returning the previous state
    pub(crate) fn try_transition(&self, next: TaskState) -> Result<TaskState, TransitionError> {
        let mut state = self.state.lock();
        let prev = *state;
        if !prev.can_transition_to(next) {
            return Err(TransitionError {
                key: format!("{:?}", self.key),
                from: prev,
                to: next,
            });
        }
        *state = next;
        drop(state);

        let mut timing = self.timing.lock();
        if next == TaskState::Executing {
            timing.started_at = Some(Utc::now());
        } else if next.is_terminal() {
            timing.finished_at = Some(Utc::now());
        }
        Ok(prev)
    }

    fn advance(&self, next: TaskState) {
        if let Err(err) = self.try_transition(next) {
            error!("{}", err);
            panic!("{}", err);
        }
    }

    /// Bind the coordinator notification sink; a second binding is a defect
    pub(crate) fn bind_internal_listener(&self, listener: Arc<dyn InternalListener<K, R>>) {
        if self.internal.set(listener).is_err() {
            error!("Task {:?} bound to a coordinator twice", self.key);
            panic!("task {:?} already bound to a coordinator", self.key);
        }
    }

    pub(crate) fn on_wait(&self) {
        self.advance(TaskState::Waiting);
    }

    pub(crate) fn on_start(&self) {
        self.advance(TaskState::Executing);
    }

    pub(crate) fn on_succeed(&self, result: Arc<R>) {
        self.advance(TaskState::Succeeded);
        *self.result.lock() = Some(result);
    }

    pub(crate) fn on_failed(&self, error: Arc<TaskError>) {
        self.advance(TaskState::Failed);
        *self.error.lock() = Some(error);
    }

    pub(crate) fn on_canceled(&self) {
        self.advance(TaskState::Canceled);
    }

    /// Execution wrapper run on a pool thread.
    ///
    /// Posts Started, runs the body, then posts exactly one terminal notification.
    /// Panics inside the body are reported as failures. A task whose flag was
    /// set before it reached a thread is reported canceled without running.
    pub(crate) fn run(self: &Arc<Self>) {
        let Some(internal) = self.internal.get().cloned() else {
            error!("Task {:?} executed without a coordinator binding", self.key);
            return;
        };

        if self.is_terminal() {
            debug!("Task {:?} already {}, skipping body", self.key, self.state());
            return;
        }

        let Some(body) = self.body.lock().take() else {
            warn!("Task {:?} body already consumed", self.key);
            return;
        };

        if self.token.is_canceled() {
            debug!("Task {:?} canceled before start, dropping body", self.key);
            drop(body);
            internal.on_canceled(self);
            return;
        }

        internal.on_start(self);

        let ctx = TaskContext::new(self.key.clone(), self.token.clone());
        match panic::catch_unwind(AssertUnwindSafe(move || body(&ctx))) {
            Ok(Ok(result)) => internal.on_success(self, result),
            Ok(Err(TaskError::Canceled)) => internal.on_canceled(self),
            Ok(Err(err)) => internal.on_failed(self, err),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!("Task {:?} panicked: {}", self.key, message);
                internal.on_failed(self, TaskError::Panicked(message));
            }
        }
    }
}

impl<K: std::fmt::Debug, R> std::fmt::Debug for Task<K, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("key", &self.key)
            .field("state", &*self.state.lock())
            .field("cancel_requested", &self.token.is_canceled())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl InternalListener<&'static str, u32> for Recorder {
        fn on_start(&self, task: &Arc<Task<&'static str, u32>>) {
            self.calls.lock().push(format!("start:{}", task.key()));
        }

        fn on_success(&self, task: &Arc<Task<&'static str, u32>>, result: u32) {
            self.calls.lock().push(format!("success:{}:{}", task.key(), result));
        }

        fn on_failed(&self, task: &Arc<Task<&'static str, u32>>, error: TaskError) {
            self.calls.lock().push(format!("failed:{}:{}", task.key(), error));
        }

        fn on_canceled(&self, task: &Arc<Task<&'static str, u32>>) {
            self.calls.lock().push(format!("canceled:{}", task.key()));
        }
    }

    fn bound(task: Task<&'static str, u32>) -> (Arc<Task<&'static str, u32>>, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let task = Arc::new(task);
        task.bind_internal_listener(recorder.clone());
        (task, recorder)
    }

    #[test]
    fn test_task_creation() {
        let task: Task<&str, u32> = Task::new("a", |_| Ok(1));
        assert_eq!(*task.key(), "a");
        assert_eq!(task.state(), TaskState::Created);
        assert!(!task.is_cancel_requested());
        assert!(task.result().is_none());
        assert!(task.duration_ms().is_none());
    }

    #[test]
    fn test_lifecycle_hooks() {
        let task: Task<&str, u32> = Task::new("a", |_| Ok(1));
        task.on_wait();
        task.on_start();
        assert_eq!(task.state(), TaskState::Executing);
        assert!(task.started_at().is_some());

        task.on_succeed(Arc::new(7));
        assert_eq!(task.state(), TaskState::Succeeded);
        assert_eq!(task.result().as_deref(), Some(&7));
        assert!(task.finished_at().is_some());
        assert!(task.error().is_none());
    }

    #[test]
    fn test_cancel_while_waiting() {
        let task: Task<&str, u32> = Task::new("a", |_| Ok(1));
        task.on_wait();
        task.cancel();
        task.on_canceled();
        assert_eq!(task.state(), TaskState::Canceled);
        assert!(task.started_at().is_none());
    }

    #[test]
    fn test_try_transition_rejects_reverse() {
        let task: Task<&str, u32> = Task::new("a", |_| Ok(1));
        task.on_wait();
        let err = task.try_transition(TaskState::Created).unwrap_err();
        assert_eq!(err.from, TaskState::Waiting);
        assert_eq!(err.to, TaskState::Created);
        assert_eq!(task.state(), TaskState::Waiting);
    }

    #[test]
    #[should_panic(expected = "Illegal transition")]
    fn test_repeated_terminal_transition_panics() {
        let task: Task<&str, u32> = Task::new("a", |_| Ok(1));
        task.on_wait();
        task.on_start();
        task.on_failed(Arc::new(TaskError::failed("boom")));
        task.on_succeed(Arc::new(1));
    }

    #[test]
    #[should_panic(expected = "already bound")]
    fn test_double_binding_panics() {
        let (task, recorder) = bound(Task::new("a", |_| Ok(1)));
        task.bind_internal_listener(recorder);
    }

    #[test]
    fn test_run_reports_success() {
        let (task, recorder) = bound(Task::new("a", |_| Ok(42)));
        task.run();
        assert_eq!(*recorder.calls.lock(), vec!["start:a", "success:a:42"]);
    }

    #[test]
    fn test_run_reports_body_cancel() {
        let (task, recorder) = bound(Task::new("a", |ctx| {
            ctx.token().cancel();
            ctx.check_canceled()?;
            Ok(1)
        }));
        task.run();
        assert_eq!(*recorder.calls.lock(), vec!["start:a", "canceled:a"]);
    }

    #[test]
    fn test_run_catches_panic() {
        let (task, recorder) = bound(Task::new("a", |_| -> Result<u32, TaskError> {
            panic!("exploded")
        }));
        task.run();
        let calls = recorder.calls.lock();
        assert_eq!(calls[0], "start:a");
        assert_eq!(calls[1], "failed:a:Task panicked: exploded");
    }

    #[test]
    fn test_run_reports_flag_set_before_start() {
        let (task, recorder) = bound(Task::new("a", |_| -> Result<u32, TaskError> {
            panic!("body must not run")
        }));
        task.on_wait();
        task.cancel();
        task.run();
        assert_eq!(*recorder.calls.lock(), vec!["canceled:a"]);

        task.run();
        assert_eq!(recorder.calls.lock().len(), 1);
    }

    #[test]
    fn test_run_skips_terminal_task() {
        let (task, recorder) = bound(Task::new("a", |_| Ok(1)));
        task.on_wait();
        task.cancel();
        task.on_canceled();
        task.run();
        assert!(recorder.calls.lock().is_empty());
    }

    #[test]
    fn test_run_consumes_body_once() {
        let (task, recorder) = bound(Task::new("a", |_| Ok(1)));
        task.run();
        task.run();
        assert_eq!(recorder.calls.lock().len(), 2);
    }

    #[test]
    fn test_info_snapshot() {
        let task: Task<String, u32> = Task::new("a".to_string(), |_| Ok(1));
        task.cancel();
        let info = task.info();
        assert_eq!(info.key, "a");
        assert_eq!(info.state, TaskState::Created);
        assert!(info.cancel_requested);
        assert!(info.started_at.is_none());
    }
}
