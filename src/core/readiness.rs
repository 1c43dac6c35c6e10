//! Readiness classification derived from dependency completion.
//!
//! A task's readiness is a function of its own status and the statuses of
//! its direct dependencies only; blocking does not propagate transitively
//! beyond what sequential direct checks imply. States move toward
//! `Completed` as dependencies resolve and never regress except through
//! the administrative revert path.

use crate::core::graph::DependencyGraph;
use crate::core::task::{TaskId, TaskStatus};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Derived execution readiness of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessState {
    /// At least one direct dependency is not completed.
    Blocked,
    /// All dependencies completed and the task itself is pending.
    Ready,
    /// All dependencies completed and work is underway.
    InProgress,
    /// The task itself is completed.
    Completed,
}

impl std::fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadinessState::Blocked => write!(f, "blocked"),
            ReadinessState::Ready => write!(f, "ready"),
            ReadinessState::InProgress => write!(f, "in_progress"),
            ReadinessState::Completed => write!(f, "completed"),
        }
    }
}

fn status_of(statuses: &HashMap<TaskId, TaskStatus>, id: &TaskId) -> TaskStatus {
    statuses.get(id).copied().unwrap_or_default()
}

/// Classify one task from its own status and its direct dependencies.
pub(crate) fn classify(
    graph: &DependencyGraph,
    statuses: &HashMap<TaskId, TaskStatus>,
    id: &TaskId,
) -> ReadinessState {
    let own = status_of(statuses, id);
    if own == TaskStatus::Completed {
        return ReadinessState::Completed;
    }

    let all_deps_completed = graph
        .dependencies_of(id)
        .iter()
        .all(|dep| status_of(statuses, dep) == TaskStatus::Completed);

    if !all_deps_completed {
        return ReadinessState::Blocked;
    }

    match own {
        TaskStatus::Pending => ReadinessState::Ready,
        TaskStatus::InProgress => ReadinessState::InProgress,
        TaskStatus::Completed => ReadinessState::Completed,
    }
}

/// Classify every task in the graph.
///
/// The graph is a validated DAG by construction, so evaluation cannot be
/// called against unvalidated structure.
pub fn evaluate(
    graph: &DependencyGraph,
    statuses: &HashMap<TaskId, TaskStatus>,
) -> HashMap<TaskId, ReadinessState> {
    graph
        .task_ids()
        .into_iter()
        .map(|id| {
            let state = classify(graph, statuses, &id);
            (id, state)
        })
        .collect()
}

/// Classify a single task.
///
/// # Errors
/// Returns `UnknownTask` if the id is not in the graph.
pub fn readiness_of(
    graph: &DependencyGraph,
    statuses: &HashMap<TaskId, TaskStatus>,
    id: &TaskId,
) -> Result<ReadinessState> {
    if !graph.contains(id) {
        return Err(Error::UnknownTask(id.clone()));
    }
    Ok(classify(graph, statuses, id))
}

/// Direct dependencies of a task that are not yet completed, in the
/// task's declared dependency order.
pub fn blocking_dependencies(
    graph: &DependencyGraph,
    statuses: &HashMap<TaskId, TaskStatus>,
    id: &TaskId,
) -> Vec<TaskId> {
    graph
        .dependencies_of(id)
        .iter()
        .filter(|dep| status_of(statuses, dep) != TaskStatus::Completed)
        .cloned()
        .collect()
}
