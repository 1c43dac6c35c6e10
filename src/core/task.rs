//! Task identity and lifecycle status.
//!
//! Task ids are opaque strings supplied by the external task store; the
//! engine never interprets them beyond equality and ordering. Status is
//! the three-state lifecycle the store reports for each task.

use serde::{Deserialize, Serialize};

/// Unique identifier for a task, as supplied by the task store.
///
/// Ordering is lexicographic and is used wherever the engine needs a
/// deterministic tie-break (topological ordering, chain selection,
/// change-set ordering).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Wrap an externally supplied id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Task status as reported by the external store.
///
/// `Completed` is terminal for graph purposes; the only way backward is
/// the administrative revert path, which forces a full re-validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task exists but work has not started.
    #[default]
    Pending,
    /// Work on the task is underway.
    InProgress,
    /// Task is done; dependents may become ready.
    Completed,
}

impl TaskStatus {
    /// Whether this status ends the task's lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }

    /// Whether a normal (non-administrative) transition to `next` is legal.
    ///
    /// The state machine only moves forward: Pending -> InProgress ->
    /// Completed, with Pending -> Completed allowed as a shortcut.
    pub fn can_advance_to(&self, next: TaskStatus) -> bool {
        self.rank() < next.rank()
    }

    fn rank(&self) -> u8 {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::InProgress => 1,
            TaskStatus::Completed => 2,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Completed => write!(f, "completed"),
        }
    }
}
