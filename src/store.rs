//! Inbound task data: snapshots from the external task store and
//! status-change events.
//!
//! The engine does not persist anything. An external store (REST backend,
//! message queue bridge, test fixture) supplies full `TaskSnapshot`s and
//! pushes `StatusChange` events; this module defines those wire shapes and
//! the `TaskSource` trait adapters implement. Field names serialize in
//! camelCase to match the dashboard backend that feeds the engine.

use crate::core::task::{TaskId, TaskStatus};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One task as the external store reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    /// Opaque unique identifier.
    pub id: TaskId,
    /// Lifecycle status at snapshot time.
    #[serde(default)]
    pub status: TaskStatus,
    /// Estimated cost in abstract units; the engine substitutes its
    /// configured default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_estimate: Option<f64>,
    /// Ids of tasks that must complete before this one is ready.
    #[serde(default)]
    pub dependency_ids: Vec<TaskId>,
    /// Opaque department reference, carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,
    /// Opaque assignee reference, carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
}

impl TaskRecord {
    /// Create a minimal pending record with no dependencies.
    pub fn new(id: impl Into<TaskId>) -> Self {
        Self {
            id: id.into(),
            status: TaskStatus::Pending,
            duration_estimate: None,
            dependency_ids: Vec::new(),
            department_id: None,
            assignee_id: None,
        }
    }
}

/// A complete task set as delivered by the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub tasks: Vec<TaskRecord>,
}

impl TaskSnapshot {
    pub fn new(tasks: Vec<TaskRecord>) -> Self {
        Self { tasks }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// A single status-change event pushed by an external client.
///
/// Batches are not a wire concept; a batch is just a sequence of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    /// Task whose status changed.
    pub task_id: TaskId,
    /// The status the task moved to.
    pub new_status: TaskStatus,
    /// When the client observed the change.
    pub timestamp: DateTime<Utc>,
    /// Graph version the client last saw, when it tracks one. Lets the
    /// engine tell a stale event from a plainly unknown task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_version: Option<u64>,
}

impl StatusChange {
    /// Create an event stamped with the current time.
    pub fn new(task_id: impl Into<TaskId>, new_status: TaskStatus) -> Self {
        Self {
            task_id: task_id.into(),
            new_status,
            timestamp: Utc::now(),
            graph_version: None,
        }
    }

    /// Stamp the event with the graph version the sender observed.
    pub fn at_version(mut self, version: u64) -> Self {
        self.graph_version = Some(version);
        self
    }
}

/// Read-only view over an externally owned task collection.
///
/// The engine pulls a full snapshot through this on demand; change
/// notification is transport-specific and out of scope here.
pub trait TaskSource {
    /// Fetch the current complete task set.
    fn load(&self) -> Result<TaskSnapshot>;
}

/// In-memory `TaskSource` used by tests and embedding examples.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    tasks: Vec<TaskRecord>,
}

impl InMemoryTaskStore {
    pub fn new(tasks: Vec<TaskRecord>) -> Self {
        Self { tasks }
    }

    /// Insert or replace a record by id.
    pub fn upsert(&mut self, record: TaskRecord) {
        match self.tasks.iter_mut().find(|t| t.id == record.id) {
            Some(existing) => *existing = record,
            None => self.tasks.push(record),
        }
    }

    /// Remove a record by id. Returns whether anything was removed.
    pub fn remove(&mut self, id: &TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| &t.id != id);
        self.tasks.len() != before
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl TaskSource for InMemoryTaskStore {
    fn load(&self) -> Result<TaskSnapshot> {
        Ok(TaskSnapshot::new(self.tasks.clone()))
    }
}
