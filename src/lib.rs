//! Geo-anchored scene location engine
//!
//! Keeps content tied to real-world coordinates positioned correctly in an
//! augmented-reality scene frame. Location fixes are paired with the camera
//! position at arrival, the best recent pairing becomes the reference for
//! translating any coordinate into scene space, and a periodic reconciliation
//! re-places every tracked node as the camera moves.

pub mod core;
pub mod algorithms;
pub mod session;
pub mod scene;
pub mod api;
pub mod utils;

// Re-export commonly used types
pub use core::{Bearing, Coordinate, GeoLocation, LocationError, Post, ScenePosition, ScreenPoint};
pub use algorithms::{AnchorPlacementRule, EstimateStore, GeoSceneEstimate, Placement, PlacementPolicy};
pub use scene::{CameraState, LocationNode, NodeRegistry, PostLocationNode, UpsertOutcome};
pub use session::{MemoryScene, MockTrackingSession, SceneGraph, SessionConfiguration, TrackingSession};
pub use api::{EngineError, EngineResult, EngineSnapshot, SceneLocationEngine};
pub use utils::{ConfigError, ConfigurationManager, EngineConfig};
