//! Keyed task coordinator.
//!
//! Tasks are submitted to a worker pool through a single serialized event
//! loop that owns every lifecycle transition and delivers listener callbacks
//! in order.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod keys;
pub mod pool;
pub mod tasks;

pub use config::CoordinatorConfig;
pub use coordinator::{
    CallbackReceiver, ChannelDelivery, Coordinator, CoordinatorBuilder, CoordinatorEvent, Delivery,
    InlineDelivery, QueueStats,
};
pub use error::{ConfigError, CoordinatorError, CoordinatorResult, PoolError, TaskError, TransitionError};
pub use keys::{DigestKeys, KeyGenerator, SequentialKeys, UuidKeys};
pub use pool::{FixedThreadPool, Job, RuntimePool, WorkerPool};
pub use tasks::{CancelToken, Task, TaskContext, TaskInfo, TaskKey, TaskListener, TaskState};
