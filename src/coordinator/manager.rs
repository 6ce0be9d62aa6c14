//! Task Coordinator
//!
//! Single-consumer event loop owning the waiting, executing and finished
//! queues. Callers post commands; pool threads post lifecycle notifications;
//! one dedicated thread applies both in order and delivers listener callbacks.

use log::{debug, error, info, warn};
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use super::delivery::{Delivery, InlineDelivery};
use super::events::CoordinatorEvent;
use super::mailbox::{MailboxListener, Message};
use super::queues::TaskQueue;
use crate::config::CoordinatorConfig;
use crate::error::{CoordinatorResult, TaskError};
use crate::pool::{FixedThreadPool, WorkerPool};
use crate::tasks::listener::InternalListener;
use crate::tasks::{Task, TaskContext, TaskInfo, TaskKey, TaskListener, TaskState};

/// State shared between the coordinator handle and its thread
struct Shared<K, R> {
    running: AtomicBool,
    /// Set once by `shutdown`; the coordinator never runs again
    stopped: AtomicBool,
    waiting: TaskQueue<K, R>,
    executing: TaskQueue<K, R>,
    finished: TaskQueue<K, R>,
}

/// Queue statistics
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub waiting: usize,
    pub executing: usize,
    pub finished: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub canceled: usize,
    /// Pool capacity (None if unbounded)
    pub pool_capacity: Option<usize>,
}

/// Handle to a running coordinator.
///
/// `submit` and `cancel` never block; queries take a queue read lock for one
/// linear scan and may be stale as soon as they return. Dropping the handle
/// closes the mailbox and lets the coordinator thread exit.
pub struct Coordinator<K, R> {
    shared: Arc<Shared<K, R>>,
    mailbox: mpsc::UnboundedSender<Message<K, R>>,
    pool: Arc<dyn WorkerPool>,
    events: broadcast::Sender<CoordinatorEvent<K>>,
    config: CoordinatorConfig,
}

impl<K: TaskKey, R: Send + Sync + 'static> Coordinator<K, R> {
    /// Create a builder
    pub fn builder() -> CoordinatorBuilder<K, R> {
        CoordinatorBuilder::new()
    }

    /// Build with a default fixed pool sized by `config`
    pub fn new(config: CoordinatorConfig) -> CoordinatorResult<Self> {
        Self::builder().config(config).build()
    }

    /// Build on an existing pool
    pub fn with_pool(pool: Arc<dyn WorkerPool>, config: CoordinatorConfig) -> CoordinatorResult<Self> {
        Self::builder().config(config).shared_pool(pool).build()
    }

    /// Begin processing commands; a no-op once `shutdown` was called
    pub fn start(&self) {
        if self.shared.stopped.load(Ordering::SeqCst) {
            warn!("Coordinator was shut down, ignoring start");
            return;
        }
        if !self.shared.running.swap(true, Ordering::SeqCst) {
            info!("Coordinator started");
        }
    }

    /// Stop processing commands for good and shut the pool down.
    ///
    /// Anything still in the mailbox, and anything posted afterwards, is ignored.
    pub fn shutdown(&self) {
        self.shared.stopped.store(true, Ordering::SeqCst);
        if self.shared.running.swap(false, Ordering::SeqCst) {
            info!("Coordinator shutting down");
        }
        self.pool.shutdown();
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Submit a task; returns the shared handle without waiting for admission
    pub fn submit(&self, task: Task<K, R>) -> Arc<Task<K, R>> {
        let task = Arc::new(task);
        self.post(Message::Submit(task.clone()));
        task
    }

    /// Build and submit a task from its parts
    pub fn submit_with<F, L>(&self, key: K, body: F, listener: L) -> Arc<Task<K, R>>
    where
        F: FnOnce(&TaskContext<K>) -> Result<R, TaskError> + Send + 'static,
        L: TaskListener<K, R> + 'static,
    {
        self.submit(Task::new(key, body).with_listener(listener))
    }

    /// Request cancellation of the task with this key (best effort)
    pub fn cancel(&self, key: K) {
        self.post(Message::Cancel(key));
    }

    /// Drop all retained finished tasks
    pub fn clear_finished(&self) {
        self.post(Message::ClearFinished);
    }

    fn post(&self, message: Message<K, R>) {
        if let Err(e) = self.mailbox.send(message) {
            warn!("Coordinator thread is gone, dropping {} command", e.0.name());
        }
    }

    /// Post a raw mailbox message, bypassing the pool
    #[cfg(test)]
    pub(crate) fn inject(&self, message: Message<K, R>) {
        self.post(message);
    }

    /// Find a waiting or executing task by key
    pub fn find(&self, key: &K) -> Option<Arc<Task<K, R>>> {
        self.shared
            .waiting
            .find(key)
            .or_else(|| self.shared.executing.find(key))
    }

    pub fn is_waiting(&self, key: &K) -> bool {
        self.shared.waiting.contains_key(key)
    }

    pub fn is_executing(&self, key: &K) -> bool {
        self.shared.executing.contains_key(key)
    }

    pub fn is_finished(&self, key: &K) -> bool {
        self.shared.finished.contains_key(key)
    }

    /// Most recent retained finished task with this key
    pub fn find_finished(&self, key: &K) -> Option<Arc<Task<K, R>>> {
        self.shared.finished.find_last(key)
    }

    /// Keys in the waiting queue, in admission order
    pub fn waiting_keys(&self) -> Vec<K> {
        self.shared
            .waiting
            .snapshot()
            .iter()
            .map(|t| t.key().clone())
            .collect()
    }

    /// Keys in the executing queue
    pub fn executing_keys(&self) -> Vec<K> {
        self.shared
            .executing
            .snapshot()
            .iter()
            .map(|t| t.key().clone())
            .collect()
    }

    /// Snapshots of retained finished tasks, oldest first
    pub fn finished_tasks(&self) -> Vec<TaskInfo<K>> {
        self.shared.finished.snapshot().iter().map(|t| t.info()).collect()
    }

    /// Get queue statistics
    pub fn stats(&self) -> QueueStats {
        let finished = &self.shared.finished;
        QueueStats {
            waiting: self.shared.waiting.len(),
            executing: self.shared.executing.len(),
            finished: finished.len(),
            succeeded: finished.count_where(|t| t.state() == TaskState::Succeeded),
            failed: finished.count_where(|t| t.state() == TaskState::Failed),
            canceled: finished.count_where(|t| t.state() == TaskState::Canceled),
            pool_capacity: self.pool.capacity(),
        }
    }

    /// Subscribe to coordinator events
    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent<K>> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }
}

/// Builder for a coordinator
pub struct CoordinatorBuilder<K, R> {
    config: CoordinatorConfig,
    pool: Option<Arc<dyn WorkerPool>>,
    delivery: Option<Arc<dyn Delivery>>,
    _marker: PhantomData<fn() -> (K, R)>,
}

impl<K: TaskKey, R: Send + Sync + 'static> CoordinatorBuilder<K, R> {
    pub fn new() -> Self {
        Self {
            config: CoordinatorConfig::default(),
            pool: None,
            delivery: None,
            _marker: PhantomData,
        }
    }

    pub fn config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Use this pool instead of a default fixed pool
    pub fn pool(self, pool: impl WorkerPool + 'static) -> Self {
        self.shared_pool(Arc::new(pool))
    }

    pub fn shared_pool(mut self, pool: Arc<dyn WorkerPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Route listener callbacks through this policy (default: inline)
    pub fn delivery(mut self, delivery: impl Delivery + 'static) -> Self {
        self.delivery = Some(Arc::new(delivery));
        self
    }

    /// Validate config, create the pool if needed and spawn the coordinator thread
    pub fn build(self) -> CoordinatorResult<Coordinator<K, R>> {
        let config = self.config;
        config.validate()?;

        let pool = match self.pool {
            Some(pool) => pool,
            None => Arc::new(FixedThreadPool::new(config.pool_size)?),
        };
        let delivery = self.delivery.unwrap_or_else(|| Arc::new(InlineDelivery));

        let shared = Arc::new(Shared {
            running: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            waiting: TaskQueue::new("waiting"),
            executing: TaskQueue::new("executing"),
            finished: TaskQueue::new("finished"),
        });
        let (mailbox, receiver) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(config.event_capacity);

        let event_loop = EventLoop {
            shared: shared.clone(),
            pool: pool.clone(),
            delivery,
            events: events.clone(),
            binding: Arc::new(MailboxListener::new(mailbox.downgrade())),
            finished_capacity: config.finished_capacity,
        };

        std::thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || event_loop.run(receiver))?;

        let coordinator = Coordinator {
            shared,
            mailbox,
            pool,
            events,
            config,
        };
        if coordinator.config.autostart {
            coordinator.start();
        }
        Ok(coordinator)
    }
}

impl<K: TaskKey, R: Send + Sync + 'static> Default for CoordinatorBuilder<K, R> {
    fn default() -> Self {
        Self::new()
    }
}

/// The coordinator thread's side: the only writer of queues and task state
struct EventLoop<K, R> {
    shared: Arc<Shared<K, R>>,
    pool: Arc<dyn WorkerPool>,
    delivery: Arc<dyn Delivery>,
    events: broadcast::Sender<CoordinatorEvent<K>>,
    binding: Arc<dyn InternalListener<K, R>>,
    finished_capacity: Option<usize>,
}

impl<K: TaskKey, R: Send + Sync + 'static> EventLoop<K, R> {
    fn run(self, mut receiver: mpsc::UnboundedReceiver<Message<K, R>>) {
        debug!("Coordinator loop running");
        while let Some(message) = receiver.blocking_recv() {
            self.handle(message);
        }
        debug!("Coordinator mailbox closed, loop exiting");
    }

    fn handle(&self, message: Message<K, R>) {
        if !self.shared.running.load(Ordering::SeqCst) {
            debug!("Coordinator not running, ignoring {}", message.name());
            return;
        }

        match message {
            Message::Submit(task) => self.on_submit(task),
            Message::Cancel(key) => self.on_cancel(key),
            Message::ClearFinished => self.on_clear_finished(),
            Message::Started(task) => self.on_started(task),
            Message::Succeeded(task, result) => self.on_succeeded(task, result),
            Message::Failed(task, err) => self.on_failed(task, err),
            Message::Canceled(task) => self.on_canceled(task),
        }
    }

    fn on_submit(&self, task: Arc<Task<K, R>>) {
        task.bind_internal_listener(self.binding.clone());
        task.on_wait();
        self.shared.waiting.push_back(task.clone());
        debug!("Task {:?} admitted, {} waiting", task.key(), self.shared.waiting.len());
        self.emit(CoordinatorEvent::Submitted {
            key: task.key().clone(),
        });

        let job_task = task.clone();
        if let Err(e) = self.pool.execute(Box::new(move || job_task.run())) {
            warn!("Pool rejected task {:?}: {}", task.key(), e);
            self.shared.waiting.remove(&task);
            task.cancel();
            task.on_canceled();
            self.finish(&task, CoordinatorEvent::Canceled {
                key: task.key().clone(),
            });
            self.notify(&task, |listener, key| listener.on_canceled(key));
        }
    }

    fn on_cancel(&self, key: K) {
        if let Some(task) = self.shared.waiting.remove_key(&key) {
            task.cancel();
            task.on_canceled();
            info!("Canceled task {:?} before start", key);
            self.finish(&task, CoordinatorEvent::Canceled { key });
            self.notify(&task, |listener, key| listener.on_canceled(key));
        } else if let Some(task) = self.shared.executing.find(&key) {
            task.cancel();
            info!("Cancel requested for executing task {:?}", key);
        } else {
            debug!("Cancel for {:?} ignored: not waiting or executing", key);
        }
    }

    fn on_clear_finished(&self) {
        let cleared = self.shared.finished.clear();
        debug!("Cleared {} finished tasks", cleared.len());
    }

    fn on_started(&self, task: Arc<Task<K, R>>) {
        if self.is_stale(&task, "started", &[TaskState::Waiting]) {
            return;
        }
        self.shared.waiting.remove(&task);
        task.on_start();
        self.shared.executing.push_back(task.clone());
        debug!("Task {:?} executing", task.key());
        self.emit(CoordinatorEvent::Started {
            key: task.key().clone(),
        });
        self.notify(&task, |listener, key| listener.on_start(key));
    }

    fn on_succeeded(&self, task: Arc<Task<K, R>>, result: R) {
        if self.is_stale(&task, "succeeded", &[TaskState::Executing]) {
            return;
        }
        self.shared.executing.remove(&task);
        let result = Arc::new(result);
        task.on_succeed(result.clone());
        info!("Task {:?} succeeded", task.key());
        self.finish(&task, CoordinatorEvent::Succeeded {
            key: task.key().clone(),
        });
        self.notify(&task, move |listener, key| listener.on_success(key, &result));
    }

    fn on_failed(&self, task: Arc<Task<K, R>>, err: TaskError) {
        if self.is_stale(&task, "failed", &[TaskState::Executing]) {
            return;
        }
        self.shared.executing.remove(&task);
        warn!("Task {:?} failed: {}", task.key(), err);
        let err = Arc::new(err);
        task.on_failed(err.clone());
        self.finish(&task, CoordinatorEvent::Failed {
            key: task.key().clone(),
            error: err.to_string(),
        });
        self.notify(&task, move |listener, key| listener.on_failed(key, &err));
    }

    fn on_canceled(&self, task: Arc<Task<K, R>>) {
        let live = [TaskState::Waiting, TaskState::Executing];
        if self.is_stale(&task, "canceled", &live) {
            return;
        }
        if !self.shared.waiting.remove(&task) {
            self.shared.executing.remove(&task);
        }
        task.on_canceled();
        info!("Task {:?} canceled", task.key());
        self.finish(&task, CoordinatorEvent::Canceled {
            key: task.key().clone(),
        });
        self.notify(&task, |listener, key| listener.on_canceled(key));
    }

    /// A notification only applies from the states listed in `expected`.
    ///
    /// First terminal outcome wins; anything arriving after it, or out of
    /// lifecycle order, is discarded.
    fn is_stale(
        &self,
        task: &Arc<Task<K, R>>,
        notification: &str,
        expected: &[TaskState],
    ) -> bool {
        let state = task.state();
        if expected.contains(&state) {
            return false;
        }
        debug!(
            "Discarding {} notification for task {:?} in state {}",
            notification,
            task.key(),
            state
        );
        true
    }

    /// Move a terminal task into history and apply retention
    fn finish(&self, task: &Arc<Task<K, R>>, event: CoordinatorEvent<K>) {
        let finished = &self.shared.finished;
        finished.push_back(task.clone());
        self.emit(event);

        if let Some(capacity) = self.finished_capacity {
            for evicted in finished.evict_oldest(capacity) {
                debug!("Evicted task {:?} from {} queue", evicted.key(), finished.name());
                self.emit(CoordinatorEvent::Evicted {
                    key: evicted.key().clone(),
                });
            }
        }
    }

    fn emit(&self, event: CoordinatorEvent<K>) {
        let _ = self.events.send(event);
    }

    fn notify<F>(&self, task: &Arc<Task<K, R>>, callback: F)
    where
        F: FnOnce(&dyn TaskListener<K, R>, &K) + Send + 'static,
    {
        let Some(listener) = task.listener().cloned() else {
            return;
        };
        let task = task.clone();
        self.delivery
            .deliver(Box::new(move || callback(listener.as_ref(), task.key())));
    }
}

impl<K, R> Drop for EventLoop<K, R> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            error!("Coordinator loop aborted by a panic; task lifecycle invariant violated");
        }
    }
}
