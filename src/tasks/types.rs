//! Task Types
//!
//! Lifecycle state and serializable snapshots for coordinated tasks.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::error::TaskError;

use super::context::TaskContext;

/// Bounds every task key must satisfy.
///
/// Keys are only ever compared for equality; `Clone` and `Debug` are needed
/// for callback contexts, events and log lines.
pub trait TaskKey: Eq + Clone + Debug + Send + Sync + 'static {}

impl<T> TaskKey for T where T: Eq + Clone + Debug + Send + Sync + 'static {}

/// Body of a task, run once on a worker pool thread
pub type TaskBody<K, R> = Box<dyn FnOnce(&TaskContext<K>) -> Result<R, TaskError> + Send + 'static>;

/// Lifecycle state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Built but not yet submitted
    Created,
    /// Admitted to the coordinator, waiting for a pool thread
    Waiting,
    /// Body is running on a pool thread
    Executing,
    /// Body returned a result
    Succeeded,
    /// Body returned an error or panicked
    Failed,
    /// Canceled before start, or the body honored a cancel request
    Canceled,
}

impl Default for TaskState {
    fn default() -> Self {
        Self::Created
    }
}

impl TaskState {
    /// Check if the state is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    /// Check if the task is still owned by the waiting or executing queue
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Waiting | Self::Executing)
    }

    /// Whether `next` is a legal successor of this state.
    ///
    /// Transitions only move forward: Created -> Waiting -> Executing -> terminal,
    /// with Waiting -> Canceled allowed for tasks canceled before they start.
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Waiting)
                | (Self::Waiting, Self::Executing)
                | (Self::Waiting, Self::Canceled)
                | (Self::Executing, Self::Succeeded)
                | (Self::Executing, Self::Failed)
                | (Self::Executing, Self::Canceled)
        )
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Waiting => write!(f, "waiting"),
            Self::Executing => write!(f, "executing"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Canceled => write!(f, "canceled"),
        }
    }
}

/// Task info snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInfo<K> {
    pub key: K,
    pub state: TaskState,
    pub cancel_requested: bool,
    pub error: Option<String>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub duration_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TaskState; 6] = [
        TaskState::Created,
        TaskState::Waiting,
        TaskState::Executing,
        TaskState::Succeeded,
        TaskState::Failed,
        TaskState::Canceled,
    ];

    #[test]
    fn test_forward_transitions() {
        assert!(TaskState::Created.can_transition_to(TaskState::Waiting));
        assert!(TaskState::Waiting.can_transition_to(TaskState::Executing));
        assert!(TaskState::Waiting.can_transition_to(TaskState::Canceled));
        assert!(TaskState::Executing.can_transition_to(TaskState::Succeeded));
        assert!(TaskState::Executing.can_transition_to(TaskState::Failed));
        assert!(TaskState::Executing.can_transition_to(TaskState::Canceled));
    }

    #[test]
    fn test_no_reverse_or_repeat() {
        for state in ALL {
            assert!(!state.can_transition_to(state), "{} repeated", state);
            assert!(!state.can_transition_to(TaskState::Created));
        }
        assert!(!TaskState::Created.can_transition_to(TaskState::Executing));
        assert!(!TaskState::Waiting.can_transition_to(TaskState::Succeeded));
        assert!(!TaskState::Waiting.can_transition_to(TaskState::Failed));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for from in ALL.iter().filter(|s| s.is_terminal()) {
            for to in ALL {
                assert!(!from.can_transition_to(to));
            }
        }
    }

    #[test]
    fn test_state_serde() {
        let json = serde_json::to_string(&TaskState::Executing).unwrap();
        assert_eq!(json, "\"executing\"");
        let back: TaskState = serde_json::from_str("\"canceled\"").unwrap();
        assert_eq!(back, TaskState::Canceled);
    }
}
