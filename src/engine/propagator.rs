//! Incremental update propagation over the engine's derived state.
//!
//! A status change touches the changed task and ripples outward through
//! backward (dependent) edges only as far as readiness actually changes;
//! most changes stop after one hop. The critical-path cache is never
//! recomputed here; it is marked dirty and recomputed on the next read,
//! so bursts of status flips pay the analysis cost once.

use crate::core::critical_path::{analyze, CriticalPathResult};
use crate::core::graph::DependencyGraph;
use crate::core::readiness::{classify, evaluate, ReadinessState};
use crate::core::task::{TaskId, TaskStatus};
use crate::dflog_debug;
use crate::engine::events::ChangeSet;
use crate::error::{Error, Result};
use crate::store::{StatusChange, TaskRecord, TaskSnapshot};
use std::collections::{HashMap, HashSet, VecDeque};

/// Dirty-flag cache for the critical-path analysis.
///
/// A plain flag, not an invalidation graph: any mutation marks it dirty
/// and the next read recomputes from the current graph.
#[derive(Debug, Default)]
pub(crate) struct CriticalPathCache {
    cached: Option<CriticalPathResult>,
    dirty: bool,
}

impl CriticalPathCache {
    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty || self.cached.is_none()
    }

    /// Mark the cache dirty. Returns true if it was clean before.
    ///
    /// The previously computed result is kept around: a status flip does
    /// not alter what a fresh analysis would produce, only a structural
    /// swap does, and that goes through `reset`.
    pub(crate) fn mark_dirty(&mut self) -> bool {
        let was_clean = !self.is_dirty();
        self.dirty = true;
        was_clean
    }

    /// Drop any cached result, e.g. after a graph swap.
    pub(crate) fn reset(&mut self) {
        self.cached = None;
        self.dirty = true;
    }

    /// The most recently computed result, if any, dirty or not.
    pub(crate) fn last_computed(&self) -> Option<&CriticalPathResult> {
        self.cached.as_ref()
    }

    /// Return the cached result, recomputing first when dirty.
    pub(crate) fn get_or_compute(&mut self, graph: &DependencyGraph) -> &CriticalPathResult {
        if self.dirty {
            self.cached = None;
            self.dirty = false;
        }
        self.cached.get_or_insert_with(|| {
            dflog_debug!(
                "Recomputing critical path for graph v{} ({} tasks)",
                graph.version(),
                graph.task_count()
            );
            analyze(graph)
        })
    }
}

/// The engine's mutable state: the last-known-good graph and everything
/// derived from it.
///
/// All mutation goes through the methods below under the single-writer
/// discipline the façade enforces. A failed mutation leaves every field
/// untouched, so readers only ever see the previous consistent state or
/// the fully updated one.
pub(crate) struct EngineState {
    /// Records of the installed snapshot, statuses kept current. Source
    /// for full re-validation on revert.
    records: Vec<TaskRecord>,
    graph: Option<DependencyGraph>,
    statuses: HashMap<TaskId, TaskStatus>,
    readiness: HashMap<TaskId, ReadinessState>,
    pub(crate) critical: CriticalPathCache,
}

impl EngineState {
    pub(crate) fn new() -> Self {
        Self {
            records: Vec::new(),
            graph: None,
            statuses: HashMap::new(),
            readiness: HashMap::new(),
            critical: CriticalPathCache::default(),
        }
    }

    pub(crate) fn graph(&self) -> Result<&DependencyGraph> {
        self.graph.as_ref().ok_or(Error::NoGraph)
    }

    pub(crate) fn statuses(&self) -> &HashMap<TaskId, TaskStatus> {
        &self.statuses
    }

    pub(crate) fn readiness_map(&self) -> &HashMap<TaskId, ReadinessState> {
        &self.readiness
    }

    /// Readiness of a single task.
    pub(crate) fn readiness_of(&self, id: &TaskId) -> Result<ReadinessState> {
        let graph = self.graph()?;
        if !graph.contains(id) {
            return Err(Error::UnknownTask(id.clone()));
        }
        Ok(self
            .readiness
            .get(id)
            .copied()
            .unwrap_or(ReadinessState::Blocked))
    }

    /// Critical-path result for the current graph, recomputed when dirty.
    pub(crate) fn critical_path_result(&mut self) -> Result<&CriticalPathResult> {
        let graph = self.graph.as_ref().ok_or(Error::NoGraph)?;
        Ok(self.critical.get_or_compute(graph))
    }

    /// Ids of all currently blocked tasks, sorted.
    pub(crate) fn blocked_tasks(&self) -> Result<Vec<TaskId>> {
        self.graph()?;
        let mut out: Vec<TaskId> = self
            .readiness
            .iter()
            .filter(|(_, state)| **state == ReadinessState::Blocked)
            .map(|(id, _)| id.clone())
            .collect();
        out.sort();
        Ok(out)
    }

    /// Install a new snapshot, replacing graph and derived state.
    ///
    /// Builds and validates first; if the snapshot is invalid the
    /// previous graph stays authoritative and the error is returned.
    pub(crate) fn install_snapshot(
        &mut self,
        snapshot: TaskSnapshot,
        default_duration: f64,
    ) -> Result<ChangeSet> {
        let graph = DependencyGraph::build(&snapshot.tasks, default_duration)?;
        let statuses: HashMap<TaskId, TaskStatus> = snapshot
            .tasks
            .iter()
            .map(|t| (t.id.clone(), t.status))
            .collect();
        let readiness = evaluate(&graph, &statuses);
        let changed = readiness_diff(&self.readiness, &readiness);
        let graph_version = graph.version();

        dflog_debug!(
            "Installed snapshot v{}: {} tasks, {} edges, {} readiness changes",
            graph_version,
            graph.task_count(),
            graph.dependency_count(),
            changed.len()
        );

        self.records = snapshot.tasks;
        self.graph = Some(graph);
        self.statuses = statuses;
        self.readiness = readiness;
        self.critical.reset();

        Ok(ChangeSet {
            changed_task_ids: changed,
            new_critical_path: true,
            graph_version,
        })
    }

    /// Apply one forward status transition.
    ///
    /// # Errors
    /// - `NoGraph` before the first snapshot
    /// - `UnknownTask` for an id absent from the current graph
    /// - `StaleSnapshot` when the event is stamped with an older graph
    ///   version and its task is gone from the latest one
    /// - `InvalidTransition` for a backward or same-status move
    pub(crate) fn apply_status_change(&mut self, change: &StatusChange) -> Result<ChangeSet> {
        let graph = self.graph.as_ref().ok_or(Error::NoGraph)?;
        let graph_version = graph.version();

        if !graph.contains(&change.task_id) {
            if let Some(event_version) = change.graph_version {
                if event_version < graph_version {
                    return Err(Error::StaleSnapshot {
                        event_version,
                        graph_version,
                    });
                }
            }
            return Err(Error::UnknownTask(change.task_id.clone()));
        }

        let current = self
            .statuses
            .get(&change.task_id)
            .copied()
            .unwrap_or_default();
        if !current.can_advance_to(change.new_status) {
            return Err(Error::InvalidTransition {
                task: change.task_id.clone(),
                from: current,
                to: change.new_status,
            });
        }

        self.statuses
            .insert(change.task_id.clone(), change.new_status);
        if let Some(rec) = self.records.iter_mut().find(|r| r.id == change.task_id) {
            rec.status = change.new_status;
        }

        let changed = self.propagate_readiness(&change.task_id);
        let newly_dirty = self.critical.mark_dirty();

        dflog_debug!(
            "Applied {} -> {} for {}: {} downstream changes",
            current,
            change.new_status,
            change.task_id,
            changed.len()
        );

        Ok(ChangeSet {
            changed_task_ids: changed,
            new_critical_path: newly_dirty,
            graph_version,
        })
    }

    /// Administrative rollback of a task's status.
    ///
    /// Unlike the normal path this may move backward, and it is treated as
    /// a structural change: the graph is rebuilt and re-validated from the
    /// retained records instead of being patched incrementally.
    pub(crate) fn revert_status(
        &mut self,
        task_id: &TaskId,
        new_status: TaskStatus,
        default_duration: f64,
    ) -> Result<ChangeSet> {
        let graph = self.graph()?;
        if !graph.contains(task_id) {
            return Err(Error::UnknownTask(task_id.clone()));
        }

        let mut records = self.records.clone();
        if let Some(rec) = records.iter_mut().find(|r| &r.id == task_id) {
            rec.status = new_status;
        }

        dflog_debug!("Reverting {} to {}, full re-validation", task_id, new_status);
        self.install_snapshot(TaskSnapshot::new(records), default_duration)
    }

    /// Recompute readiness outward from `origin` through dependent edges.
    ///
    /// Breadth-first; a branch is pruned as soon as a task's readiness
    /// comes out unchanged. Returns the changed task ids (sorted), not
    /// counting the origin itself, whose move is implied by the event
    /// that caused it.
    fn propagate_readiness(&mut self, origin: &TaskId) -> Vec<TaskId> {
        let Some(graph) = self.graph.as_ref() else {
            return Vec::new();
        };

        let mut changed = Vec::new();
        let mut visited: HashSet<TaskId> = HashSet::new();
        let mut queue: VecDeque<TaskId> = VecDeque::from([origin.clone()]);

        while let Some(id) = queue.pop_front() {
            if !visited.insert(id.clone()) {
                continue;
            }

            let next = classify(graph, &self.statuses, &id);
            if self.readiness.get(&id) == Some(&next) {
                continue;
            }
            self.readiness.insert(id.clone(), next);
            if id != *origin {
                changed.push(id.clone());
            }

            for dependent in graph.dependents_of(&id) {
                if !visited.contains(&dependent) {
                    queue.push_back(dependent);
                }
            }
        }

        changed.sort();
        changed
    }
}

/// Ids whose readiness differs between two maps (including tasks present
/// in only one of them), sorted.
fn readiness_diff(
    old: &HashMap<TaskId, ReadinessState>,
    new: &HashMap<TaskId, ReadinessState>,
) -> Vec<TaskId> {
    let mut changed: Vec<TaskId> = new
        .iter()
        .filter(|(id, state)| old.get(*id) != Some(state))
        .map(|(id, _)| id.clone())
        .collect();
    changed.extend(old.keys().filter(|id| !new.contains_key(*id)).cloned());
    changed.sort();
    changed
}
