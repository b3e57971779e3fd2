//! Placeable nodes

use crate::algorithms::{Placement, PlacementPolicy};
use crate::core::{Coordinate, GeoLocation, Post, ScenePosition};

/// A node anchored to a geographic coordinate
pub trait LocationNode {
    /// Registry key
    fn node_id(&self) -> &str;

    /// Geographic anchor of the node
    fn coordinates(&self) -> &Coordinate;

    /// Whether the reconciliation loop keeps re-placing this node
    fn continually_update_position_or_scale(&self) -> bool;

    /// Last computed placement, `None` until the camera location was known
    fn placement(&self) -> Option<&Placement>;

    /// Recompute and store the placement for the given camera state
    fn adjust_to_location(
        &mut self,
        current_location: &GeoLocation,
        current_scene_position: &ScenePosition,
        policy: &PlacementPolicy,
    ) -> Placement;
}

/// Scene node presenting a feed post
#[derive(Debug, Clone, PartialEq)]
pub struct PostLocationNode {
    post: Post,
    continually_update: bool,
    placement: Option<Placement>,
}

impl PostLocationNode {
    pub fn new(post: Post) -> Self {
        Self {
            post,
            continually_update: true,
            placement: None,
        }
    }

    /// Node placed once and left alone by the reconciliation loop
    pub fn pinned(post: Post) -> Self {
        Self {
            continually_update: false,
            ..Self::new(post)
        }
    }

    pub fn post(&self) -> &Post {
        &self.post
    }

    pub fn replies(&self) -> &[Post] {
        &self.post.replies
    }

    pub fn set_continually_update(&mut self, enabled: bool) {
        self.continually_update = enabled;
    }

    /// Refresh content from a newer copy of the post.
    ///
    /// The node keeps its coordinates and placement; only content changes.
    pub fn update_with(&mut self, post: Post) {
        let coordinates = self.post.coordinates;
        self.post = Post { coordinates, ..post };
    }

    /// Attach a new reply. Returns false if it was already present.
    pub fn created_reply(&mut self, reply: Post) -> bool {
        if self.post.replies.iter().any(|existing| existing.id == reply.id) {
            return false;
        }
        self.post.replies.push(reply);
        true
    }

    /// Drop a reported reply. Returns false if it was not present.
    pub fn reported_reply(&mut self, reply: &Post) -> bool {
        let before = self.post.replies.len();
        self.post.replies.retain(|existing| existing.id != reply.id);
        self.post.replies.len() != before
    }
}

impl LocationNode for PostLocationNode {
    fn node_id(&self) -> &str {
        &self.post.id
    }

    fn coordinates(&self) -> &Coordinate {
        &self.post.coordinates
    }

    fn continually_update_position_or_scale(&self) -> bool {
        self.continually_update
    }

    fn placement(&self) -> Option<&Placement> {
        self.placement.as_ref()
    }

    fn adjust_to_location(
        &mut self,
        current_location: &GeoLocation,
        current_scene_position: &ScenePosition,
        policy: &PlacementPolicy,
    ) -> Placement {
        let placement = policy.placement_for(&self.post.coordinates, current_location, current_scene_position);
        self.placement = Some(placement);
        placement
    }
}
