//! Common API types

use crate::core::{Bearing, GeoLocation, LocationError};
use crate::utils::ConfigError;
use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine error types.
///
/// Missing camera pose, location or heading are not errors: affected
/// operations degrade to no-ops. These variants cover the engine's own
/// plumbing and rejected inputs.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The worker thread has stopped; commands can no longer be delivered
    #[error("engine worker is not running")]
    WorkerUnavailable,
    /// A background thread could not be started
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
    /// The worker thread panicked before shutdown completed
    #[error("engine worker panicked")]
    WorkerPanicked,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Location(#[from] LocationError),
}

/// Point-in-time view of the worker's state
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
    /// Estimates currently held by the store
    pub estimate_count: usize,
    /// Registered post ids, sorted
    pub node_ids: Vec<String>,
    /// Nodes attached to the scene graph
    pub attached_count: usize,
    /// Latest compass heading
    pub heading: Option<Bearing>,
    /// Reconciliation ticks processed since start
    pub reconcile_ticks: u64,
    /// Translated camera location at the time of the snapshot
    pub current_location: Option<GeoLocation>,
}
