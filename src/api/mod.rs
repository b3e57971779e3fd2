//! Engine API
//!
//! [`SceneLocationEngine`] is the entry point: it receives session, location
//! and feed callbacks and keeps the scene graph aligned with the real world.

pub mod commands;
pub mod engine;
pub mod shared_state;
pub mod types;
pub mod worker;

pub use engine::SceneLocationEngine;
pub use types::{EngineError, EngineResult, EngineSnapshot};
