//! Work items delivered to the engine worker.
//!
//! Every state mutation travels through one queue and is applied in arrival
//! order. Requests that need an answer carry a reply sender.

use crate::api::types::EngineSnapshot;
use crate::core::{Bearing, GeoLocation, Post, ScenePosition};
use crate::utils::EngineConfig;
use crossbeam_channel::Sender;

#[derive(Debug)]
pub enum Command {
    /// Location fix paired with the camera position at arrival
    RecordEstimate {
        location: GeoLocation,
        scene_position: Option<ScenePosition>,
    },
    UpdateHeading(Bearing),
    /// Post authored on this device
    PostCreated {
        post: Post,
        scene_position: Option<ScenePosition>,
    },
    /// Authoritative nearby set from the feed
    PostsLoaded {
        posts: Vec<Post>,
        scene_position: Option<ScenePosition>,
    },
    PostReported {
        post_id: String,
    },
    ReplyCreated {
        original_post_id: String,
        reply: Post,
    },
    ReplyReported {
        original_post_id: String,
        reply: Post,
    },
    /// One reconciliation tick
    Reconcile {
        scene_position: Option<ScenePosition>,
    },
    ResetPosts,
    ClearEstimates,
    ApplyConfig(EngineConfig),
    /// Confirm a hit-test candidate against the registry
    ResolveSelection {
        candidate: Option<String>,
        reply: Sender<Option<String>>,
    },
    Snapshot {
        scene_position: Option<ScenePosition>,
        reply: Sender<EngineSnapshot>,
    },
    /// Answered once everything queued before it has been applied
    Flush(Sender<()>),
    Shutdown,
}
