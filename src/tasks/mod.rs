//! Tasks Module
//!
//! Keyed units of work with a monotonic lifecycle, cooperative cancellation
//! and outcome listeners.

pub mod context;
pub mod listener;
pub mod task;
pub mod types;

pub use context::{CancelToken, TaskContext};
pub use listener::TaskListener;
pub use task::Task;
pub use types::{TaskBody, TaskInfo, TaskKey, TaskState};
