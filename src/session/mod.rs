//! Interfaces to the rendering/tracking collaborator
//!
//! The engine never talks to a renderer directly. It starts and stops a
//! [`TrackingSession`], hit-tests through it, and attaches nodes to a
//! [`SceneGraph`]. In-memory implementations support tests and the demo.

pub mod tracking;
pub mod scene_graph;
pub mod mock;
pub mod simulated;

pub use tracking::{SessionConfiguration, TrackingSession, WorldAlignment};
pub use scene_graph::SceneGraph;
pub use mock::{MemoryScene, MockTrackingSession, SceneNodeState};
pub use simulated::SimulatedLocationProvider;
