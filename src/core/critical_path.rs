//! Critical-path analysis over the validated dependency DAG.
//!
//! Kahn's algorithm produces a topological order (ties broken by task id),
//! a single forward dynamic-programming pass computes the longest
//! duration-weighted distance ending at each task, and the chain is
//! recovered by walking predecessor pointers back from the heaviest sink.
//! Identical input always yields an identical result, chain included.

use crate::core::graph::DependencyGraph;
use crate::core::task::TaskId;
use petgraph::graph::NodeIndex;
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Result of a critical-path analysis, graph-scoped.
#[derive(Debug, Clone, Default)]
pub struct CriticalPathResult {
    /// The longest weighted chain from a source to a sink, in execution order.
    pub chain: Vec<TaskId>,
    /// Sum of durations along the chain.
    pub total_duration: f64,
    /// Per-task difference between the chain's total and the longest
    /// distance ending at the task.
    pub slack: HashMap<TaskId, f64>,
    /// Longest duration-weighted distance from any source, ending at and
    /// including each task.
    pub longest_distance: HashMap<TaskId, f64>,
}

impl CriticalPathResult {
    /// Whether the given task lies on the computed critical chain.
    pub fn is_on_chain(&self, id: &TaskId) -> bool {
        self.chain.contains(id)
    }

    /// Slack for a single task, if the task was part of the analysis.
    pub fn slack_of(&self, id: &TaskId) -> Option<f64> {
        self.slack.get(id).copied()
    }
}

/// Topological order of the graph, ties broken by task id.
pub fn topological_order(graph: &DependencyGraph) -> Vec<TaskId> {
    kahn_order(graph)
        .into_iter()
        .map(|idx| graph.graph()[idx].id.clone())
        .collect()
}

// Kahn's algorithm over the petgraph structure. The ready set is a
// min-heap on task id, which fixes the order among tasks whose
// dependencies are simultaneously satisfied.
fn kahn_order(graph: &DependencyGraph) -> Vec<NodeIndex> {
    let g = graph.graph();
    let mut in_deg: Vec<usize> = g
        .node_indices()
        .map(|idx| g.neighbors_directed(idx, Direction::Incoming).count())
        .collect();

    let mut heap: BinaryHeap<Reverse<(TaskId, NodeIndex)>> = g
        .node_indices()
        .filter(|idx| in_deg[idx.index()] == 0)
        .map(|idx| Reverse((g[idx].id.clone(), idx)))
        .collect();

    let mut order = Vec::with_capacity(g.node_count());
    while let Some(Reverse((_, idx))) = heap.pop() {
        order.push(idx);
        for next in g.neighbors_directed(idx, Direction::Outgoing) {
            in_deg[next.index()] -= 1;
            if in_deg[next.index()] == 0 {
                heap.push(Reverse((g[next].id.clone(), next)));
            }
        }
    }
    order
}

/// Compute the critical path for a validated graph.
///
/// Durations are abstract non-negative units; no calendar arithmetic
/// happens here. An empty graph yields an empty chain with zero total.
pub fn analyze(graph: &DependencyGraph) -> CriticalPathResult {
    let g = graph.graph();
    if g.node_count() == 0 {
        return CriticalPathResult::default();
    }

    let order = kahn_order(graph);
    let mut dist = vec![0.0_f64; g.node_count()];
    let mut pred: Vec<Option<NodeIndex>> = vec![None; g.node_count()];

    for &idx in &order {
        let mut best: Option<(f64, NodeIndex)> = None;
        for dep in g.neighbors_directed(idx, Direction::Incoming) {
            let d = dist[dep.index()];
            let better = match best {
                None => true,
                Some((best_d, best_idx)) => {
                    d > best_d || (d == best_d && g[dep].id < g[best_idx].id)
                }
            };
            if better {
                best = Some((d, dep));
            }
        }

        let upstream = best.map(|(d, _)| d).unwrap_or(0.0);
        dist[idx.index()] = g[idx].duration + upstream;
        pred[idx.index()] = best.map(|(_, dep)| dep);
    }

    // Heaviest sink wins; ties go to the smaller task id.
    let mut end: Option<NodeIndex> = None;
    for idx in g.node_indices() {
        if g.neighbors_directed(idx, Direction::Outgoing).next().is_some() {
            continue;
        }
        let better = match end {
            None => true,
            Some(cur) => {
                dist[idx.index()] > dist[cur.index()]
                    || (dist[idx.index()] == dist[cur.index()] && g[idx].id < g[cur].id)
            }
        };
        if better {
            end = Some(idx);
        }
    }

    let mut chain = Vec::new();
    let mut cursor = end;
    while let Some(idx) = cursor {
        chain.push(g[idx].id.clone());
        cursor = pred[idx.index()];
    }
    chain.reverse();

    let total_duration = end.map(|idx| dist[idx.index()]).unwrap_or(0.0);

    let mut slack = HashMap::with_capacity(g.node_count());
    let mut longest_distance = HashMap::with_capacity(g.node_count());
    for idx in g.node_indices() {
        let id = g[idx].id.clone();
        longest_distance.insert(id.clone(), dist[idx.index()]);
        slack.insert(id, total_duration - dist[idx.index()]);
    }

    CriticalPathResult {
        chain,
        total_duration,
        slack,
        longest_distance,
    }
}
