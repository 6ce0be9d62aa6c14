//! Error Types
//!
//! Error handling for task bodies, worker pools, configuration and the coordinator.

use thiserror::Error;

use crate::tasks::TaskState;

/// Outcome error reported by a task body
#[derive(Error, Debug)]
pub enum TaskError {
    /// The body observed the cooperative cancel flag and stopped
    #[error("Task canceled")]
    Canceled,

    /// The body panicked; the payload message is kept when it is a string
    #[error("Task panicked: {0}")]
    Panicked(String),

    /// Any domain failure raised by the body
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl TaskError {
    /// Build a failure from a plain message
    pub fn failed(message: impl Into<String>) -> Self {
        TaskError::Failed(anyhow::anyhow!(message.into()))
    }

    /// Whether this error means the body honored a cancel request
    pub fn is_canceled(&self) -> bool {
        matches!(self, TaskError::Canceled)
    }
}

/// Illegal lifecycle transition attempted on a task
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Illegal transition for task {key}: {from} -> {to}")]
pub struct TransitionError {
    pub key: String,
    pub from: TaskState,
    pub to: TaskState,
}

/// Worker pool errors
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Worker pool is shut down")]
    Closed,

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Coordinator construction errors
#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("Failed to spawn coordinator thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Result type alias for coordinator operations
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;
