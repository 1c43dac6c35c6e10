//! Structural validation across realistic snapshots.

use crate::fixtures::{diamond_snapshot, id, layered_snapshot, record};
use depflow::{DependencyGraph, Error};

#[test]
fn test_valid_snapshot_builds() {
    let snapshot = diamond_snapshot();
    let graph = DependencyGraph::build(&snapshot.tasks, 1.0).unwrap();
    assert_eq!(graph.task_count(), 4);
    assert_eq!(graph.dependency_count(), 4);
}

#[test]
fn test_large_layered_snapshot_builds() {
    let snapshot = layered_snapshot(6, 4);
    let graph = DependencyGraph::build(&snapshot.tasks, 1.0).unwrap();
    assert_eq!(graph.task_count(), 24);
    assert!(graph.roots().len() >= 4);
}

#[test]
fn test_dangling_reference_reports_both_ids() {
    let records = vec![record("e", 1.0, &["ghost"])];
    let err = DependencyGraph::build(&records, 1.0).unwrap_err();
    assert!(matches!(
        err,
        Error::DanglingReference { task, missing }
            if task == id("e") && missing == id("ghost")
    ));
}

#[test]
fn test_cycle_is_fatal_never_partial() {
    // The cyclic pair is unreachable from the valid part; the build must
    // still refuse the whole snapshot.
    let records = vec![
        record("ok-1", 1.0, &[]),
        record("ok-2", 1.0, &["ok-1"]),
        record("x", 1.0, &["y"]),
        record("y", 1.0, &["x"]),
    ];
    let err = DependencyGraph::build(&records, 1.0).unwrap_err();

    let Error::CycleDetected(cycle) = err else {
        panic!("Expected CycleDetected, got {:?}", err);
    };
    assert_eq!(cycle.len(), 2);
    assert!(cycle.contains(&id("x")));
    assert!(cycle.contains(&id("y")));
}

#[test]
fn test_every_cyclic_variant_is_rejected() {
    let variants: Vec<Vec<depflow::TaskRecord>> = vec![
        // self-loop
        vec![record("a", 1.0, &["a"])],
        // two-cycle
        vec![record("a", 1.0, &["b"]), record("b", 1.0, &["a"])],
        // long cycle through a chain
        vec![
            record("a", 1.0, &["d"]),
            record("b", 1.0, &["a"]),
            record("c", 1.0, &["b"]),
            record("d", 1.0, &["c"]),
        ],
        // cycle entered from a valid prefix
        vec![
            record("root", 1.0, &[]),
            record("a", 1.0, &["root", "c"]),
            record("b", 1.0, &["a"]),
            record("c", 1.0, &["b"]),
        ],
    ];

    for records in variants {
        let result = DependencyGraph::build(&records, 1.0);
        assert!(
            matches!(result, Err(Error::CycleDetected(_))),
            "cycle not detected in {:?}",
            records.iter().map(|r| r.id.clone()).collect::<Vec<_>>()
        );
    }
}

#[test]
fn test_dependency_edges_are_indexed_both_ways() {
    let snapshot = diamond_snapshot();
    let graph = DependencyGraph::build(&snapshot.tasks, 1.0).unwrap();

    // Forward: d's dependencies in declared order.
    assert_eq!(graph.dependencies_of(&id("d")), &[id("b"), id("c")]);
    // Backward: a's dependents.
    assert_eq!(graph.dependents_of(&id("a")), vec![id("b"), id("c")]);
}

#[test]
fn test_build_is_pure() {
    // Building twice from the same input yields equivalent structure and
    // leaves the input untouched.
    let snapshot = diamond_snapshot();
    let before = serde_json::to_string(&snapshot.tasks).unwrap();

    let g1 = DependencyGraph::build(&snapshot.tasks, 1.0).unwrap();
    let g2 = DependencyGraph::build(&snapshot.tasks, 1.0).unwrap();

    assert_eq!(serde_json::to_string(&snapshot.tasks).unwrap(), before);
    assert_eq!(g1.task_ids(), g2.task_ids());
    assert_eq!(g1.dependency_count(), g2.dependency_count());
}
