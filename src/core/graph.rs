//! Dependency graph construction and structural validation.
//!
//! The graph is built from a flat task snapshot and validated in one shot:
//! every dependency reference must resolve, and the edge set must be
//! acyclic. A `DependencyGraph` value therefore always represents a
//! validated DAG; downstream components never re-check structure.

use crate::core::next_version;
use crate::core::task::TaskId;
use crate::error::{Error, Result};
use crate::store::TaskRecord;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

/// Structural task data carried as a graph node weight.
///
/// Department and assignee references are opaque pass-through fields for
/// consumers; the engine does not interpret them.
#[derive(Debug, Clone)]
pub struct TaskNode {
    /// Task identifier.
    pub id: TaskId,
    /// Resolved duration estimate (snapshot value or the configured default).
    pub duration: f64,
    /// Direct dependencies in declared order, deduplicated.
    pub dependency_ids: Vec<TaskId>,
    /// Opaque department reference, if any.
    pub department_id: Option<String>,
    /// Opaque assignee reference, if any.
    pub assignee_id: Option<String>,
}

/// A validated task dependency DAG.
///
/// Built with petgraph's `DiGraph`; an edge `A -> B` means B depends on A.
/// Incoming neighbors of a node are its dependencies, outgoing neighbors
/// its dependents, so both traversal directions come from one structure.
pub struct DependencyGraph {
    graph: DiGraph<TaskNode, ()>,
    index: HashMap<TaskId, NodeIndex>,
    version: u64,
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

impl DependencyGraph {
    /// Build and validate a graph from a task snapshot.
    ///
    /// Tasks missing a duration estimate get `default_duration`.
    ///
    /// # Errors
    /// - `DuplicateTask` if the snapshot lists an id twice
    /// - `InvalidDuration` for a negative or non-finite estimate
    /// - `DanglingReference` if a dependency id is absent from the snapshot
    /// - `CycleDetected` (with the full cycle path) if the edges are cyclic
    pub fn build(records: &[TaskRecord], default_duration: f64) -> Result<Self> {
        let mut graph = DiGraph::new();
        let mut index: HashMap<TaskId, NodeIndex> = HashMap::with_capacity(records.len());

        for record in records {
            if index.contains_key(&record.id) {
                return Err(Error::DuplicateTask(record.id.clone()));
            }

            let duration = record.duration_estimate.unwrap_or(default_duration);
            if !duration.is_finite() || duration < 0.0 {
                return Err(Error::InvalidDuration {
                    task: record.id.clone(),
                    value: duration,
                });
            }

            // Declared order survives; repeated entries collapse to one.
            let mut seen = HashSet::new();
            let dependency_ids: Vec<TaskId> = record
                .dependency_ids
                .iter()
                .filter(|dep| seen.insert((*dep).clone()))
                .cloned()
                .collect();

            let node = TaskNode {
                id: record.id.clone(),
                duration,
                dependency_ids,
                department_id: record.department_id.clone(),
                assignee_id: record.assignee_id.clone(),
            };
            let idx = graph.add_node(node);
            index.insert(record.id.clone(), idx);
        }

        for record in records {
            let task_idx = index[&record.id];
            let deps = graph[task_idx].dependency_ids.clone();
            for dep in &deps {
                let dep_idx = *index.get(dep).ok_or_else(|| Error::DanglingReference {
                    task: record.id.clone(),
                    missing: dep.clone(),
                })?;
                graph.add_edge(dep_idx, task_idx, ());
            }
        }

        let built = Self {
            graph,
            index,
            version: next_version(),
        };

        if let Some(cycle) = built.find_cycle() {
            return Err(Error::CycleDetected(cycle));
        }

        Ok(built)
    }

    /// Snapshot version this graph was validated at.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Check if the graph contains a task.
    pub fn contains(&self, id: &TaskId) -> bool {
        self.index.contains_key(id)
    }

    /// Get the node data for a task.
    pub fn node(&self, id: &TaskId) -> Option<&TaskNode> {
        self.index.get(id).map(|&idx| &self.graph[idx])
    }

    /// Resolved duration for a task.
    pub fn duration_of(&self, id: &TaskId) -> Option<f64> {
        self.node(id).map(|n| n.duration)
    }

    /// Number of tasks in the graph.
    pub fn task_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of dependency edges in the graph.
    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// All task ids, sorted.
    pub fn task_ids(&self) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self.index.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Direct dependencies of a task, in declared order.
    ///
    /// Empty for tasks without dependencies and for unknown ids.
    pub fn dependencies_of(&self, id: &TaskId) -> &[TaskId] {
        self.index
            .get(id)
            .map(|&idx| self.graph[idx].dependency_ids.as_slice())
            .unwrap_or(&[])
    }

    /// Direct dependents of a task (tasks that list it as a dependency), sorted.
    pub fn dependents_of(&self, id: &TaskId) -> Vec<TaskId> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        let mut out: Vec<TaskId> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|n| self.graph[n].id.clone())
            .collect();
        out.sort();
        out
    }

    /// Tasks with no dependencies, sorted.
    pub fn roots(&self) -> Vec<TaskId> {
        let mut out: Vec<TaskId> = self
            .graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|idx| self.graph[idx].id.clone())
            .collect();
        out.sort();
        out
    }

    /// Tasks with no dependents, sorted.
    pub fn sinks(&self) -> Vec<TaskId> {
        let mut out: Vec<TaskId> = self
            .graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Outgoing)
                    .next()
                    .is_none()
            })
            .map(|idx| self.graph[idx].id.clone())
            .collect();
        out.sort();
        out
    }

    pub(crate) fn graph(&self) -> &DiGraph<TaskNode, ()> {
        &self.graph
    }

    pub(crate) fn node_index(&self, id: &TaskId) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    /// Three-color depth-first cycle search.
    ///
    /// Returns the full cycle path (each task once, last closing back to
    /// first) when a back-edge to an in-progress node is found. Traversal
    /// order is fixed by task id so the reported cycle is deterministic.
    fn find_cycle(&self) -> Option<Vec<TaskId>> {
        let mut marks = vec![Mark::Unvisited; self.graph.node_count()];

        let mut starts: Vec<NodeIndex> = self.graph.node_indices().collect();
        starts.sort_by(|a, b| self.graph[*a].id.cmp(&self.graph[*b].id));

        for start in starts {
            if marks[start.index()] != Mark::Unvisited {
                continue;
            }

            marks[start.index()] = Mark::InProgress;
            let mut path = vec![start];
            let mut stack = vec![self.successors_descending(start)];

            while let Some(next_succ) = stack.last_mut().map(|succs| succs.pop()) {
                match next_succ {
                    Some(next) => match marks[next.index()] {
                        Mark::Unvisited => {
                            marks[next.index()] = Mark::InProgress;
                            path.push(next);
                            stack.push(self.successors_descending(next));
                        }
                        Mark::InProgress => {
                            // Back edge: the cycle is the path suffix from `next`.
                            let pos = path.iter().position(|n| *n == next).unwrap_or(0);
                            return Some(
                                path[pos..]
                                    .iter()
                                    .map(|n| self.graph[*n].id.clone())
                                    .collect(),
                            );
                        }
                        Mark::Done => {}
                    },
                    None => {
                        if let Some(done) = path.pop() {
                            marks[done.index()] = Mark::Done;
                        }
                        stack.pop();
                    }
                }
            }
        }

        None
    }

    // Descending by id so that pop() visits successors in ascending order.
    fn successors_descending(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut succs: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .collect();
        succs.sort_by(|a, b| self.graph[*b].id.cmp(&self.graph[*a].id));
        succs
    }
}

impl std::fmt::Debug for DependencyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyGraph")
            .field("tasks", &self.task_count())
            .field("dependencies", &self.dependency_count())
            .field("version", &self.version)
            .finish()
    }
}
