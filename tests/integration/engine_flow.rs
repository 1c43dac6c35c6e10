//! End-to-end engine behavior over the public façade.

use crate::fixtures::{diamond_snapshot, id, ids, layered_snapshot, record};
use depflow::{
    evaluate, Config, DependencyGraph, Engine, Error, ReadinessState, StatusChange, TaskId,
    TaskSnapshot, TaskStatus,
};
use std::collections::HashMap;
use std::time::Duration;

async fn diamond_engine() -> Engine {
    let engine = Engine::new(Config::default());
    engine.load_snapshot(diamond_snapshot()).await.unwrap();
    engine
}

#[tokio::test]
async fn test_full_project_walkthrough() {
    let engine = diamond_engine().await;

    // Initial state: only the root is ready.
    assert_eq!(
        engine.readiness(&id("a")).await.unwrap(),
        ReadinessState::Ready
    );
    assert_eq!(engine.blocked_tasks().await.unwrap(), ids(&["b", "c", "d"]));

    // The critical chain is a-b-d at total 9.
    let path = engine.critical_path().await.unwrap();
    assert_eq!(path.chain, ids(&["a", "b", "d"]));
    assert_eq!(path.total_duration, 9.0);

    // Completing a releases b and c, not d.
    let change = engine
        .apply_status_change(StatusChange::new("a", TaskStatus::Completed))
        .await
        .unwrap();
    assert_eq!(change.changed_task_ids, ids(&["b", "c"]));

    // Completing b alone is not enough for d.
    engine
        .apply_status_change(StatusChange::new("b", TaskStatus::Completed))
        .await
        .unwrap();
    assert_eq!(
        engine.readiness(&id("d")).await.unwrap(),
        ReadinessState::Blocked
    );

    // Completing c finally releases d.
    let change = engine
        .apply_status_change(StatusChange::new("c", TaskStatus::Completed))
        .await
        .unwrap();
    assert_eq!(change.changed_task_ids, ids(&["d"]));
    assert_eq!(
        engine.readiness(&id("d")).await.unwrap(),
        ReadinessState::Ready
    );

    // Structure never changed: the recomputed chain is the same.
    let path = engine.critical_path().await.unwrap();
    assert_eq!(path.chain, ids(&["a", "b", "d"]));
    assert_eq!(path.total_duration, 9.0);

    let stats = engine.stats().await.unwrap();
    assert_eq!(stats.completed, 3);
    assert_eq!(stats.ready, 1);
    assert_eq!(stats.blocked, 0);
}

#[tokio::test]
async fn test_incremental_equals_fresh_evaluation() {
    let snapshot = layered_snapshot(4, 3);
    let engine = Engine::new(Config::default());
    engine.load_snapshot(snapshot.clone()).await.unwrap();

    // Drive a realistic mixed sequence through the engine.
    let sequence = [
        ("t0-0", TaskStatus::InProgress),
        ("t0-0", TaskStatus::Completed),
        ("t0-1", TaskStatus::Completed),
        ("t0-2", TaskStatus::Completed),
        ("t1-0", TaskStatus::InProgress),
        ("t1-1", TaskStatus::Completed),
        ("t1-0", TaskStatus::Completed),
        ("t2-2", TaskStatus::InProgress),
    ];
    let mut statuses: HashMap<TaskId, TaskStatus> = snapshot
        .tasks
        .iter()
        .map(|t| (t.id.clone(), t.status))
        .collect();
    for (task, status) in sequence {
        engine
            .apply_status_change(StatusChange::new(task, status))
            .await
            .unwrap();
        statuses.insert(id(task), status);
    }

    // A fresh evaluation over the final status map must agree with the
    // incrementally maintained view.
    let graph = DependencyGraph::build(&snapshot.tasks, 1.0).unwrap();
    let fresh = evaluate(&graph, &statuses);

    let view = engine.readiness_view().await.unwrap();
    assert_eq!(view.len(), fresh.len());
    for (task, state) in &fresh {
        assert_eq!(
            view.get(task).map(|t| t.state),
            Some(*state),
            "readiness mismatch for {}",
            task
        );
    }
}

#[tokio::test]
async fn test_readiness_only_moves_forward() {
    fn rank(state: ReadinessState) -> u8 {
        match state {
            ReadinessState::Blocked => 0,
            ReadinessState::Ready => 1,
            ReadinessState::InProgress => 2,
            ReadinessState::Completed => 3,
        }
    }

    let engine = diamond_engine().await;
    let mut last: HashMap<TaskId, ReadinessState> = engine
        .readiness_view()
        .await
        .unwrap()
        .tasks
        .iter()
        .map(|(k, v)| (k.clone(), v.state))
        .collect();

    for task in ["a", "b", "c", "d"] {
        engine
            .apply_status_change(StatusChange::new(task, TaskStatus::Completed))
            .await
            .unwrap();

        let now = engine.readiness_view().await.unwrap();
        for (task_id, readiness) in &now.tasks {
            assert!(
                rank(readiness.state) >= rank(last[task_id]),
                "{} regressed from {} to {}",
                task_id,
                last[task_id],
                readiness.state
            );
        }
        last = now
            .tasks
            .iter()
            .map(|(k, v)| (k.clone(), v.state))
            .collect();
    }
}

#[tokio::test]
async fn test_subscriber_sees_ripple_only() {
    let engine = diamond_engine().await;
    let mut sub = engine.subscribe().await;

    engine
        .apply_status_change(StatusChange::new("a", TaskStatus::Completed))
        .await
        .unwrap();

    let change = tokio::time::timeout(Duration::from_secs(1), sub.receiver.recv())
        .await
        .unwrap()
        .unwrap();

    // d's readiness did not change, so it is not in the set; neither is
    // the task the event itself named.
    assert_eq!(change.changed_task_ids, ids(&["b", "c"]));
}

#[tokio::test]
async fn test_event_transport_through_command_queue() {
    let engine = diamond_engine().await;
    let sender = engine.command_sender();

    // A transport pushes events without holding the engine handle.
    for (task, status) in [
        ("a", TaskStatus::Completed),
        ("b", TaskStatus::InProgress),
        ("b", TaskStatus::Completed),
    ] {
        sender
            .send(depflow::EngineCommand::Status(StatusChange::new(
                task, status,
            )))
            .await
            .unwrap();
    }

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(
        engine.readiness(&id("b")).await.unwrap(),
        ReadinessState::Completed
    );
    assert_eq!(
        engine.readiness(&id("c")).await.unwrap(),
        ReadinessState::Ready
    );
}

#[tokio::test]
async fn test_stale_event_versus_unknown_task() {
    let engine = diamond_engine().await;
    let v1 = engine.graph_version().await.unwrap();

    // Install a fresh graph that drops task d.
    engine
        .load_snapshot(TaskSnapshot::new(vec![
            record("a", 2.0, &[]),
            record("b", 3.0, &["a"]),
            record("c", 1.0, &["a"]),
        ]))
        .await
        .unwrap();

    // An event stamped against the old version for the vanished task is
    // reported stale, not unknown.
    let err = engine
        .apply_status_change(StatusChange::new("d", TaskStatus::Completed).at_version(v1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::StaleSnapshot { .. }));

    // The same event without a version stamp is simply unknown.
    let err = engine
        .apply_status_change(StatusChange::new("d", TaskStatus::Completed))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownTask(_)));
}

#[tokio::test]
async fn test_revert_is_structural() {
    let engine = diamond_engine().await;
    engine
        .apply_status_change(StatusChange::new("a", TaskStatus::Completed))
        .await
        .unwrap();
    let v_before = engine.graph_version().await.unwrap();

    engine
        .revert_status(&id("a"), TaskStatus::InProgress)
        .await
        .unwrap();

    // Full re-validation produced a new graph version.
    let v_after = engine.graph_version().await.unwrap();
    assert!(v_after > v_before);
    assert_eq!(
        engine.readiness(&id("a")).await.unwrap(),
        ReadinessState::InProgress
    );
    assert_eq!(
        engine.readiness(&id("b")).await.unwrap(),
        ReadinessState::Blocked
    );
}

#[tokio::test]
async fn test_burst_of_flips_pays_analysis_once_per_read() {
    let engine = Engine::new(Config::default());
    engine.load_snapshot(layered_snapshot(5, 4)).await.unwrap();

    // Burst of flips: every one only marks the cache dirty.
    for slot in 0..4 {
        engine
            .apply_status_change(StatusChange::new(
                format!("t0-{}", slot),
                TaskStatus::Completed,
            ))
            .await
            .unwrap();
    }

    // The read after the burst recomputes once and is consistent.
    let path = engine.critical_path().await.unwrap();
    assert!(path.total_duration > 0.0);
    let again = engine.critical_path().await.unwrap();
    assert_eq!(path, again);
}

#[tokio::test]
async fn test_refresh_from_task_source() {
    use depflow::InMemoryTaskStore;

    let mut store = InMemoryTaskStore::default();
    for task in diamond_snapshot().tasks {
        store.upsert(task);
    }

    let engine = Engine::new(Config::default());
    engine.refresh_from(&store).await.unwrap();
    assert_eq!(engine.stats().await.unwrap().total, 4);

    // The store moves on; a refresh picks up the new truth.
    let mut completed = diamond_snapshot().tasks[0].clone();
    completed.status = TaskStatus::Completed;
    store.upsert(completed);

    engine.refresh_from(&store).await.unwrap();
    assert_eq!(
        engine.readiness(&id("b")).await.unwrap(),
        ReadinessState::Ready
    );
}

#[tokio::test]
async fn test_invalid_snapshot_mid_run_preserves_consumers() {
    let engine = diamond_engine().await;
    engine
        .apply_status_change(StatusChange::new("a", TaskStatus::Completed))
        .await
        .unwrap();

    // A broken snapshot arrives; readers keep the last good state.
    let err = engine
        .load_snapshot(TaskSnapshot::new(vec![
            record("x", 1.0, &["y"]),
            record("y", 1.0, &["x"]),
        ]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CycleDetected(_)));

    assert_eq!(
        engine.readiness(&id("b")).await.unwrap(),
        ReadinessState::Ready
    );
    let path = engine.critical_path().await.unwrap();
    assert_eq!(path.chain, ids(&["a", "b", "d"]));
}
