//! Scene graph interface used by the node registry

use crate::algorithms::Placement;
use std::time::Duration;

/// Attachment point for post nodes inside the rendered scene.
///
/// The node registry is the only caller; it guarantees that every attached id
/// is registered and vice versa.
pub trait SceneGraph: Send {
    /// Attach a node under the location root at its initial placement
    fn attach(&mut self, id: &str, placement: &Placement);

    /// Detach a node and release its rendering resources
    fn detach(&mut self, id: &str);

    /// Move or rescale an attached node.
    ///
    /// `None` snaps immediately. `Some(duration)` schedules an animated
    /// transition and returns without waiting; a later call supersedes any
    /// transition still in flight.
    fn apply(&mut self, id: &str, placement: &Placement, transition: Option<Duration>);

    /// Number of nodes currently attached
    fn attached_count(&self) -> usize;
}
