//! The live engine: serialized mutation, incremental propagation, and the
//! read façade consumers query.

pub mod events;
pub mod facade;
pub mod propagator;
pub mod views;

pub use events::{ChangeSet, SubscriberId};
pub use facade::{Engine, EngineCommand, Subscription};
pub use views::{CriticalPathView, EngineView, GraphStats, ReadinessView, TaskReadiness};
