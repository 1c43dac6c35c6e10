//! Change notifications published to subscribers.

use crate::core::task::TaskId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a change-set subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(pub Uuid);

impl SubscriberId {
    /// Create a new unique subscriber identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return first 8 characters of the UUID for display.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The outcome of one applied mutation, published to subscribers.
///
/// `changed_task_ids` lists the tasks whose readiness state the mutation
/// rippled into, sorted; the task whose status the caller changed is not
/// repeated back. `new_critical_path` flags that the cached critical-path
/// result was invalidated by this mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    pub changed_task_ids: Vec<TaskId>,
    pub new_critical_path: bool,
    /// Version of the graph the change was applied against.
    pub graph_version: u64,
}

impl ChangeSet {
    /// Whether the change had no observable effect on derived state.
    pub fn is_empty(&self) -> bool {
        self.changed_task_ids.is_empty() && !self.new_critical_path
    }
}
