//! Post nodes and the registry that owns them

pub mod node;
pub mod registry;

pub use node::{LocationNode, PostLocationNode};
pub use registry::{CameraState, NodeRegistry, UpsertOutcome};
