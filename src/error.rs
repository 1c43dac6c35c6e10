use crate::core::task::{TaskId, TaskStatus};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Task {task} references missing dependency {missing}")]
    DanglingReference { task: TaskId, missing: TaskId },

    #[error("Dependency cycle detected: {}", format_cycle(.0))]
    CycleDetected(Vec<TaskId>),

    #[error("Duplicate task id in snapshot: {0}")]
    DuplicateTask(TaskId),

    #[error("Invalid duration estimate {value} for task {task}")]
    InvalidDuration { task: TaskId, value: f64 },

    #[error("Unknown task: {0}")]
    UnknownTask(TaskId),

    #[error("Status change references snapshot version {event_version}, but task is gone from version {graph_version}")]
    StaleSnapshot { event_version: u64, graph_version: u64 },

    #[error("Invalid status transition for task {task}: {from} -> {to}")]
    InvalidTransition {
        task: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("No validated task snapshot has been loaded")]
    NoGraph,

    #[error("Engine has been shut down")]
    EngineStopped,
}

fn format_cycle(cycle: &[TaskId]) -> String {
    cycle
        .iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}

pub type Result<T> = std::result::Result<T, Error>;
