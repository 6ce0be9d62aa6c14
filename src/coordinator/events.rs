//! Coordinator Events
//!
//! Broadcast notifications for observers that are not task listeners
//! (monitoring, logging sinks, UI badges).

use serde::Serialize;

/// Event broadcast by the coordinator thread after each state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CoordinatorEvent<K> {
    /// Task admitted to the waiting queue
    Submitted { key: K },
    /// Task body started
    Started { key: K },
    /// Task succeeded
    Succeeded { key: K },
    /// Task failed
    Failed { key: K, error: String },
    /// Task canceled
    Canceled { key: K },
    /// Finished task dropped from history
    Evicted { key: K },
}

impl<K> CoordinatorEvent<K> {
    /// Get the task key from any event
    pub fn key(&self) -> &K {
        match self {
            Self::Submitted { key } => key,
            Self::Started { key } => key,
            Self::Succeeded { key } => key,
            Self::Failed { key, .. } => key,
            Self::Canceled { key } => key,
            Self::Evicted { key } => key,
        }
    }

    /// Event name for external emitters
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Submitted { .. } => "task:submitted",
            Self::Started { .. } => "task:started",
            Self::Succeeded { .. } => "task:succeeded",
            Self::Failed { .. } => "task:failed",
            Self::Canceled { .. } => "task:canceled",
            Self::Evicted { .. } => "task:evicted",
        }
    }

    /// Whether this event ends the task's lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded { .. } | Self::Failed { .. } | Self::Canceled { .. }
        )
    }
}
