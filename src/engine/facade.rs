//! The engine façade: stable read API, serialized write intake, and
//! change notification fan-out.
//!
//! One logical writer owns all mutation: direct calls and queued commands
//! both funnel through the state's write lock, and queued commands are
//! consumed strictly in arrival order by a single intake task. Readers
//! take the read lock and only ever observe a fully applied state.
//! Listener delivery runs on detached tasks so a slow subscriber can
//! never stall the writer.

use crate::config::Config;
use crate::core::readiness::ReadinessState;
use crate::core::task::{TaskId, TaskStatus};
use crate::engine::events::{ChangeSet, SubscriberId};
use crate::engine::propagator::EngineState;
use crate::engine::views::{CriticalPathView, EngineView, GraphStats, ReadinessView};
use crate::error::{Error, Result};
use crate::store::{StatusChange, TaskSnapshot, TaskSource};
use crate::{dflog_debug, dflog_warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

/// Queue capacity for inbound commands.
const COMMAND_QUEUE: usize = 256;
/// Per-subscriber buffer for change notifications.
const SUBSCRIBER_QUEUE: usize = 64;

/// A mutation routed through the engine's serialized queue.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Replace the task set with a freshly loaded snapshot.
    Snapshot(TaskSnapshot),
    /// Apply one status-change event.
    Status(StatusChange),
}

/// A registered change-set listener.
///
/// Dropping the receiver unsubscribes implicitly; the engine prunes the
/// registration on the next failed delivery.
pub struct Subscription {
    pub id: SubscriberId,
    pub receiver: mpsc::Receiver<ChangeSet>,
}

struct Inner {
    state: RwLock<EngineState>,
    default_duration: f64,
    subscribers: RwLock<HashMap<SubscriberId, mpsc::Sender<ChangeSet>>>,
    view_tx: crossbeam_channel::Sender<EngineView>,
    view_rx: crossbeam_channel::Receiver<EngineView>,
    cancel: CancellationToken,
}

/// Handle to the dependency engine.
///
/// Cheap to clone; all clones share the same state. Readers may call the
/// query methods from any number of tasks or threads concurrently.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
    command_tx: mpsc::Sender<EngineCommand>,
}

impl Engine {
    /// Create an engine and start its intake task.
    ///
    /// Must be called from within a Tokio runtime; the intake loop is
    /// spawned immediately.
    pub fn new(config: Config) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let (view_tx, view_rx) = crossbeam_channel::bounded(1);

        let inner = Arc::new(Inner {
            state: RwLock::new(EngineState::new()),
            default_duration: config.default_duration,
            subscribers: RwLock::new(HashMap::new()),
            view_tx,
            view_rx,
            cancel: CancellationToken::new(),
        });

        tokio::spawn(run_intake(Arc::clone(&inner), command_rx));

        Self { inner, command_tx }
    }

    // ========== Write API ==========

    /// Install a new task snapshot, replacing the graph.
    ///
    /// On validation failure the previous graph remains authoritative.
    pub async fn load_snapshot(&self, snapshot: TaskSnapshot) -> Result<ChangeSet> {
        Inner::install(&self.inner, snapshot).await
    }

    /// Apply a single forward status transition.
    pub async fn apply_status_change(&self, change: StatusChange) -> Result<ChangeSet> {
        Inner::apply(&self.inner, &change).await
    }

    /// Administrative rollback; forces a full graph re-validation.
    pub async fn revert_status(
        &self,
        task_id: &TaskId,
        new_status: TaskStatus,
    ) -> Result<ChangeSet> {
        Inner::revert(&self.inner, task_id, new_status).await
    }

    /// Pull a full snapshot from a task source and install it.
    pub async fn refresh_from(&self, source: &dyn TaskSource) -> Result<ChangeSet> {
        let snapshot = source.load()?;
        self.load_snapshot(snapshot).await
    }

    /// Sender half of the serialized command queue, for transports that
    /// push events without holding the engine.
    pub fn command_sender(&self) -> mpsc::Sender<EngineCommand> {
        self.command_tx.clone()
    }

    /// Enqueue a status change for the intake task. Per-event failures
    /// are logged by the intake loop, not returned here.
    pub async fn submit_status_change(&self, change: StatusChange) -> Result<()> {
        self.command_tx
            .send(EngineCommand::Status(change))
            .await
            .map_err(|_| Error::EngineStopped)
    }

    /// Enqueue a snapshot; superseded by any newer queued snapshot.
    pub async fn submit_snapshot(&self, snapshot: TaskSnapshot) -> Result<()> {
        self.command_tx
            .send(EngineCommand::Snapshot(snapshot))
            .await
            .map_err(|_| Error::EngineStopped)
    }

    // ========== Read API ==========

    /// Readiness of a single task.
    pub async fn readiness(&self, id: &TaskId) -> Result<ReadinessState> {
        self.inner.state.read().await.readiness_of(id)
    }

    /// Readiness for every task, with blocking dependencies.
    pub async fn readiness_view(&self) -> Result<ReadinessView> {
        let state = self.inner.state.read().await;
        let graph = state.graph()?;
        Ok(ReadinessView::build(
            graph,
            state.statuses(),
            state.readiness_map(),
        ))
    }

    /// Ids of all blocked tasks, sorted.
    pub async fn blocked_tasks(&self) -> Result<Vec<TaskId>> {
        self.inner.state.read().await.blocked_tasks()
    }

    /// The critical path, recomputed first if the cache is dirty.
    pub async fn critical_path(&self) -> Result<CriticalPathView> {
        let mut state = self.inner.state.write().await;
        let result = state.critical_path_result()?;
        Ok(CriticalPathView::from_result(result))
    }

    /// Summary counts for statistics consumers.
    pub async fn stats(&self) -> Result<GraphStats> {
        let state = self.inner.state.read().await;
        state.graph()?;
        Ok(GraphStats::from_readiness(state.readiness_map()))
    }

    /// Version of the currently installed graph, if any.
    pub async fn graph_version(&self) -> Option<u64> {
        self.inner
            .state
            .read()
            .await
            .graph()
            .map(|g| g.version())
            .ok()
    }

    // ========== Subscriptions ==========

    /// Register a change-set listener.
    pub async fn subscribe(&self) -> Subscription {
        let id = SubscriberId::new();
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE);
        self.inner.subscribers.write().await.insert(id, tx);
        dflog_debug!("Subscriber {} registered", id.short());
        Subscription { id, receiver: rx }
    }

    /// Remove a listener registration.
    pub async fn unsubscribe(&self, id: SubscriberId) {
        self.inner.subscribers.write().await.remove(&id);
    }

    /// Latest-wins feed of combined engine views for synchronous
    /// consumers (e.g. a render thread). Only the newest view is held;
    /// intermediate views are overwritten, never queued.
    pub fn view_feed(&self) -> crossbeam_channel::Receiver<EngineView> {
        self.inner.view_rx.clone()
    }

    // ========== Lifecycle ==========

    /// Stop the intake task. Queries keep working on the last state.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }

    /// Check if shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }
}

impl Inner {
    async fn install(inner: &Arc<Inner>, snapshot: TaskSnapshot) -> Result<ChangeSet> {
        let change = {
            let mut state = inner.state.write().await;
            let change = state.install_snapshot(snapshot, inner.default_duration)?;
            inner.publish_view(&state);
            change
        };
        Inner::notify(inner, &change).await;
        Ok(change)
    }

    async fn apply(inner: &Arc<Inner>, change: &StatusChange) -> Result<ChangeSet> {
        let produced = {
            let mut state = inner.state.write().await;
            let produced = state.apply_status_change(change)?;
            inner.publish_view(&state);
            produced
        };
        Inner::notify(inner, &produced).await;
        Ok(produced)
    }

    async fn revert(inner: &Arc<Inner>, task_id: &TaskId, status: TaskStatus) -> Result<ChangeSet> {
        let change = {
            let mut state = inner.state.write().await;
            let change = state.revert_status(task_id, status, inner.default_duration)?;
            inner.publish_view(&state);
            change
        };
        Inner::notify(inner, &change).await;
        Ok(change)
    }

    /// Publish the current derived state on the latest-wins view channel.
    ///
    /// Drain-then-send: the channel holds at most the newest view, and
    /// try_send means the writer never blocks on a slow consumer.
    fn publish_view(&self, state: &EngineState) {
        let Ok(graph) = state.graph() else {
            return;
        };
        let graph_version = graph.version();
        let readiness = ReadinessView::build(graph, state.statuses(), state.readiness_map());
        let stats = GraphStats::from_readiness(state.readiness_map());
        // Status flips do not change what an analysis would produce, so the
        // last computed result stays valid here; structural swaps clear it.
        let critical_path = state
            .critical
            .last_computed()
            .map(CriticalPathView::from_result);

        let view = EngineView {
            version: crate::core::next_version(),
            graph_version,
            readiness,
            critical_path,
            stats,
        };

        let _ = self.view_rx.try_recv();
        let _ = self.view_tx.try_send(view);
    }

    /// Fan a change set out to all subscribers.
    ///
    /// Each delivery runs on its own detached task; a full or slow
    /// subscriber delays only itself. A send to a dropped receiver
    /// removes the registration.
    async fn notify(inner: &Arc<Inner>, change: &ChangeSet) {
        let subscribers: Vec<(SubscriberId, mpsc::Sender<ChangeSet>)> = {
            let subs = inner.subscribers.read().await;
            subs.iter().map(|(id, tx)| (*id, tx.clone())).collect()
        };

        for (id, tx) in subscribers {
            let inner = Arc::clone(inner);
            let change = change.clone();
            tokio::spawn(async move {
                if tx.send(change).await.is_err() {
                    dflog_debug!("Subscriber {} gone, pruning", id.short());
                    inner.subscribers.write().await.remove(&id);
                }
            });
        }
    }
}

/// Intake loop: applies queued commands in arrival order.
///
/// When a burst has queued up, any snapshot with a newer snapshot behind
/// it in the queue is abandoned unprocessed (last writer wins at the
/// snapshot level). Status events are applied in order regardless;
/// per-event failures are logged and do not stop the loop.
async fn run_intake(inner: Arc<Inner>, mut rx: mpsc::Receiver<EngineCommand>) {
    loop {
        let first = tokio::select! {
            _ = inner.cancel.cancelled() => break,
            cmd = rx.recv() => match cmd {
                Some(cmd) => cmd,
                None => break,
            },
        };

        let mut batch = vec![first];
        while let Ok(next) = rx.try_recv() {
            batch.push(next);
        }
        let last_snapshot = batch
            .iter()
            .rposition(|c| matches!(c, EngineCommand::Snapshot(_)));

        for (i, cmd) in batch.into_iter().enumerate() {
            match cmd {
                EngineCommand::Snapshot(snapshot) => {
                    if Some(i) != last_snapshot {
                        dflog_debug!(
                            "Abandoning superseded snapshot ({} tasks)",
                            snapshot.tasks.len()
                        );
                        continue;
                    }
                    if let Err(e) = Inner::install(&inner, snapshot).await {
                        dflog_warn!("Snapshot rejected: {}", e);
                    }
                }
                EngineCommand::Status(change) => {
                    if let Err(e) = Inner::apply(&inner, &change).await {
                        dflog_warn!("Status change for {} rejected: {}", change.task_id, e);
                    }
                }
            }
        }
    }
    dflog_debug!("Engine intake loop stopped");
}
