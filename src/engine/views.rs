//! Outbound view types for UI and statistics consumers.
//!
//! Views are self-contained snapshots of derived state. They follow the
//! same pattern as the engine's internal maps but clone into plain data,
//! so consumers can hold them across await points or hand them to a
//! render thread without touching engine locks.

use crate::core::critical_path::CriticalPathResult;
use crate::core::graph::DependencyGraph;
use crate::core::readiness::{blocking_dependencies, ReadinessState};
use crate::core::task::{TaskId, TaskStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Readiness of one task plus the direct dependencies currently holding
/// it back (empty unless the task is blocked).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskReadiness {
    pub state: ReadinessState,
    pub blocking_dependencies: Vec<TaskId>,
}

/// Per-task readiness for the whole graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadinessView {
    pub tasks: HashMap<TaskId, TaskReadiness>,
}

impl ReadinessView {
    pub(crate) fn build(
        graph: &DependencyGraph,
        statuses: &HashMap<TaskId, TaskStatus>,
        readiness: &HashMap<TaskId, ReadinessState>,
    ) -> Self {
        let tasks = readiness
            .iter()
            .map(|(id, state)| {
                let blocking = match state {
                    ReadinessState::Blocked => blocking_dependencies(graph, statuses, id),
                    _ => Vec::new(),
                };
                (
                    id.clone(),
                    TaskReadiness {
                        state: *state,
                        blocking_dependencies: blocking,
                    },
                )
            })
            .collect();
        Self { tasks }
    }

    pub fn get(&self, id: &TaskId) -> Option<&TaskReadiness> {
        self.tasks.get(id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Critical-path analysis result in consumer form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalPathView {
    /// Task ids along the critical chain, in execution order.
    pub chain: Vec<TaskId>,
    /// Total duration of the chain.
    pub total_duration: f64,
    /// Per-task slack against the chain total.
    pub slack: HashMap<TaskId, f64>,
}

impl CriticalPathView {
    pub(crate) fn from_result(result: &CriticalPathResult) -> Self {
        Self {
            chain: result.chain.clone(),
            total_duration: result.total_duration,
            slack: result.slack.clone(),
        }
    }
}

/// Summary counts for the dashboard statistics widgets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub total: usize,
    pub completed: usize,
    pub ready: usize,
    pub blocked: usize,
    pub in_progress: usize,
}

impl GraphStats {
    pub fn from_readiness(readiness: &HashMap<TaskId, ReadinessState>) -> Self {
        let mut stats = Self {
            total: readiness.len(),
            ..Self::default()
        };
        for state in readiness.values() {
            match state {
                ReadinessState::Completed => stats.completed += 1,
                ReadinessState::Ready => stats.ready += 1,
                ReadinessState::Blocked => stats.blocked += 1,
                ReadinessState::InProgress => stats.in_progress += 1,
            }
        }
        stats
    }
}

/// Combined versioned snapshot published on the engine's view feed.
///
/// `critical_path` is present only when the cached analysis was clean at
/// publish time; a consumer that needs it fresh asks the façade, which
/// recomputes on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineView {
    /// Monotonic view version.
    pub version: u64,
    /// Version of the graph the view was derived from.
    pub graph_version: u64,
    pub readiness: ReadinessView,
    pub critical_path: Option<CriticalPathView>,
    pub stats: GraphStats,
}
