pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod log;
pub mod store;

pub use crate::config::Config;
pub use crate::core::critical_path::{analyze, topological_order, CriticalPathResult};
pub use crate::core::graph::{DependencyGraph, TaskNode};
pub use crate::core::readiness::{blocking_dependencies, evaluate, readiness_of, ReadinessState};
pub use crate::core::task::{TaskId, TaskStatus};
pub use crate::engine::{
    ChangeSet, CriticalPathView, Engine, EngineCommand, EngineView, GraphStats, ReadinessView,
    SubscriberId, Subscription, TaskReadiness,
};
pub use crate::error::{Error, Result};
pub use crate::store::{InMemoryTaskStore, StatusChange, TaskRecord, TaskSnapshot, TaskSource};
