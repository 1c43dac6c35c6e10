//! Critical-path optimality and determinism properties.
//!
//! Optimality is checked against brute-force path enumeration on small
//! graphs; determinism by comparing repeated runs byte for byte.

use crate::fixtures::{
    brute_force_distance, brute_force_total, diamond_snapshot, id, ids, layered_snapshot, record,
};
use depflow::{analyze, DependencyGraph, TaskSnapshot};

fn analyze_snapshot(snapshot: &TaskSnapshot) -> depflow::CriticalPathResult {
    let graph = DependencyGraph::build(&snapshot.tasks, 1.0).unwrap();
    analyze(&graph)
}

#[test]
fn test_reference_diamond() {
    let result = analyze_snapshot(&diamond_snapshot());
    assert_eq!(result.chain, ids(&["a", "b", "d"]));
    assert_eq!(result.total_duration, 9.0);
    assert_eq!(result.slack_of(&id("c")), Some(6.0));
}

#[test]
fn test_optimality_on_small_synthetic_graphs() {
    let cases: Vec<TaskSnapshot> = vec![
        // single chain
        TaskSnapshot::new(vec![
            record("a", 1.5, &[]),
            record("b", 2.5, &["a"]),
            record("c", 0.5, &["b"]),
        ]),
        // fan-out / fan-in
        TaskSnapshot::new(vec![
            record("src", 1.0, &[]),
            record("m1", 4.0, &["src"]),
            record("m2", 2.0, &["src"]),
            record("m3", 3.0, &["src"]),
            record("sink", 1.0, &["m1", "m2", "m3"]),
        ]),
        // two components with a bridge
        TaskSnapshot::new(vec![
            record("a", 2.0, &[]),
            record("b", 2.0, &["a"]),
            record("p", 1.0, &[]),
            record("q", 1.0, &["p"]),
            record("bridge", 5.0, &["b", "q"]),
            record("tail", 1.0, &["bridge"]),
        ]),
        // diamond stack, 12 nodes
        layered_snapshot(4, 3),
    ];

    for snapshot in &cases {
        let result = analyze_snapshot(snapshot);
        assert_eq!(
            result.total_duration,
            brute_force_total(&snapshot.tasks),
            "total mismatch on {:?}",
            snapshot.tasks.iter().map(|r| r.id.clone()).collect::<Vec<_>>()
        );
        for rec in &snapshot.tasks {
            assert_eq!(
                result.longest_distance[&rec.id],
                brute_force_distance(&snapshot.tasks, &rec.id),
                "distance mismatch for {}",
                rec.id
            );
        }
    }
}

#[test]
fn test_slack_is_total_minus_distance() {
    let snapshot = layered_snapshot(4, 3);
    let result = analyze_snapshot(&snapshot);

    for rec in &snapshot.tasks {
        let distance = result.longest_distance[&rec.id];
        assert_eq!(result.slack[&rec.id], result.total_duration - distance);
        assert!(result.slack[&rec.id] >= 0.0);
    }
}

#[test]
fn test_zero_slack_task_ends_the_chain() {
    let snapshot = diamond_snapshot();
    let result = analyze_snapshot(&snapshot);

    for (task, slack) in &result.slack {
        if *slack == 0.0 {
            assert!(result.is_on_chain(task), "{} has zero slack", task);
        }
    }
}

#[test]
fn test_chain_is_a_dependency_path() {
    let snapshot = layered_snapshot(5, 3);
    let graph = DependencyGraph::build(&snapshot.tasks, 1.0).unwrap();
    let result = analyze(&graph);

    for pair in result.chain.windows(2) {
        assert!(
            graph.dependencies_of(&pair[1]).contains(&pair[0]),
            "{} should depend on {}",
            pair[1],
            pair[0]
        );
    }
}

#[test]
fn test_determinism_across_runs() {
    let snapshot = layered_snapshot(5, 4);

    let r1 = analyze_snapshot(&snapshot);
    let r2 = analyze_snapshot(&snapshot);
    let r3 = analyze_snapshot(&snapshot);

    assert_eq!(r1.chain, r2.chain);
    assert_eq!(r2.chain, r3.chain);
    assert_eq!(r1.total_duration, r2.total_duration);
    assert_eq!(r1.slack, r2.slack);

    // Byte-identical chain under serialization, not just equal values.
    let bytes1 = serde_json::to_vec(&r1.chain).unwrap();
    let bytes2 = serde_json::to_vec(&r2.chain).unwrap();
    assert_eq!(bytes1, bytes2);
}

#[test]
fn test_determinism_under_input_reordering() {
    // Same tasks, shuffled record order: same chain.
    let snapshot = diamond_snapshot();
    let mut reordered = snapshot.tasks.clone();
    reordered.reverse();

    let r1 = analyze_snapshot(&snapshot);
    let r2 = analyze_snapshot(&TaskSnapshot::new(reordered));

    assert_eq!(r1.chain, r2.chain);
    assert_eq!(r1.total_duration, r2.total_duration);
}
