//! Keyed registry of placed post nodes.
//!
//! The registry owns every node from insertion until removal and is the only
//! writer to the scene graph. Registry keys and attached scene nodes are kept
//! identical: every insert attaches, every removal detaches.

use crate::algorithms::{AnchorPlacementRule, Placement, PlacementPolicy};
use crate::core::{Bearing, GeoLocation, Post, ScenePosition};
use crate::scene::node::{LocationNode, PostLocationNode};
use crate::session::SceneGraph;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::debug;

/// Camera state snapshot used to place nodes
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraState {
    /// Translated geographic location of the camera
    pub location: Option<GeoLocation>,
    /// Camera position in the scene frame
    pub scene_position: Option<ScenePosition>,
}

impl CameraState {
    fn resolved(&self) -> Option<(&GeoLocation, &ScenePosition)> {
        Some((self.location.as_ref()?, self.scene_position.as_ref()?))
    }
}

/// Result of [`NodeRegistry::upsert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Existing node refreshed in place
    Updated,
    /// New node placed and attached
    Added,
    /// Newly authored post could not be sited yet; nothing was added
    Deferred,
}

pub struct NodeRegistry {
    nodes: HashMap<String, PostLocationNode>,
    scene: Box<dyn SceneGraph>,
    policy: PlacementPolicy,
    anchor_rule: AnchorPlacementRule,
}

impl NodeRegistry {
    pub fn new(scene: Box<dyn SceneGraph>, policy: PlacementPolicy, anchor_rule: AnchorPlacementRule) -> Self {
        Self {
            nodes: HashMap::new(),
            scene,
            policy,
            anchor_rule,
        }
    }

    /// Place a node (no animation), register it and attach it.
    ///
    /// Without a camera location the node is attached at the scene origin and
    /// picked up by the next reconciliation. An existing node with the same id
    /// is detached first.
    pub fn add(&mut self, mut node: PostLocationNode, camera: &CameraState) {
        let id = node.node_id().to_string();

        if self.nodes.remove(&id).is_some() {
            self.scene.detach(&id);
        }

        let placement = match camera.resolved() {
            Some((location, position)) => node.adjust_to_location(location, position, &self.policy),
            None => {
                debug!(post_id = %id, "adding node before camera location is known");
                Placement::default()
            }
        };

        self.scene.attach(&id, &placement);
        self.nodes.insert(id, node);
    }

    /// Insert or refresh the node for `post`.
    ///
    /// Newly authored posts are sited by the anchor rule instead of their own
    /// coordinates, and deferred when no location or heading is available.
    pub fn upsert(
        &mut self,
        post: Post,
        newly_authored: bool,
        camera: &CameraState,
        heading: Option<Bearing>,
    ) -> UpsertOutcome {
        if let Some(node) = self.nodes.get_mut(&post.id) {
            node.update_with(post);
            return UpsertOutcome::Updated;
        }

        let mut post = post;
        if newly_authored {
            match self.anchor_rule.place(camera.location.as_ref(), heading) {
                Some(coordinates) => post.coordinates = coordinates,
                None => {
                    debug!(
                        post_id = %post.id,
                        has_location = camera.location.is_some(),
                        has_heading = heading.is_some(),
                        "deferring placement of authored post"
                    );
                    return UpsertOutcome::Deferred;
                }
            }
        }

        self.add(PostLocationNode::new(post), camera);
        UpsertOutcome::Added
    }

    /// Detach and drop a node. No-op when absent.
    pub fn remove(&mut self, post_id: &str) -> bool {
        match self.nodes.remove(post_id) {
            Some(_) => {
                self.scene.detach(post_id);
                true
            }
            None => false,
        }
    }

    /// Remove every node whose id is not in `authoritative_ids`.
    /// Returns the removed ids.
    pub fn reconcile_against(&mut self, authoritative_ids: &HashSet<String>) -> Vec<String> {
        let stale: Vec<String> = self
            .nodes
            .keys()
            .filter(|id| !authoritative_ids.contains(*id))
            .cloned()
            .collect();

        for id in &stale {
            self.remove(id);
        }
        stale
    }

    /// Route a new reply to its parent node
    pub fn reply_created(&mut self, original_post_id: &str, reply: Post) -> bool {
        match self.nodes.get_mut(original_post_id) {
            Some(node) => node.created_reply(reply),
            None => {
                debug!(post_id = original_post_id, reply_id = %reply.id, "reply for unplaced post dropped");
                false
            }
        }
    }

    /// Route a reported reply to its parent node
    pub fn reply_reported(&mut self, original_post_id: &str, reply: &Post) -> bool {
        match self.nodes.get_mut(original_post_id) {
            Some(node) => node.reported_reply(reply),
            None => {
                debug!(post_id = original_post_id, reply_id = %reply.id, "report for unplaced post dropped");
                false
            }
        }
    }

    /// Re-place every continually tracked node with an animated transition.
    ///
    /// Leaves everything untouched when the camera state is incomplete.
    pub fn update_tracked_nodes(&mut self, camera: &CameraState, transition: Duration) -> usize {
        let Some((location, position)) = camera.resolved() else {
            return 0;
        };

        let mut updated = 0;
        for (id, node) in self.nodes.iter_mut() {
            if !node.continually_update_position_or_scale() {
                continue;
            }
            let placement = node.adjust_to_location(location, position, &self.policy);
            self.scene.apply(id, &placement, Some(transition));
            updated += 1;
        }
        updated
    }

    /// Detach and drop every node. Returns how many were removed.
    pub fn reset_all(&mut self) -> usize {
        let count = self.nodes.len();
        for id in self.nodes.keys() {
            self.scene.detach(id);
        }
        self.nodes.clear();
        count
    }

    pub fn get(&self, post_id: &str) -> Option<&PostLocationNode> {
        self.nodes.get(post_id)
    }

    pub fn contains(&self, post_id: &str) -> bool {
        self.nodes.contains_key(post_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Registered ids in sorted order
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.nodes.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn attached_count(&self) -> usize {
        self.scene.attached_count()
    }

    pub fn set_policy(&mut self, policy: PlacementPolicy) {
        self.policy = policy;
    }

    pub fn set_anchor_rule(&mut self, anchor_rule: AnchorPlacementRule) {
        self.anchor_rule = anchor_rule;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::coordinates;
    use crate::core::Coordinate;
    use crate::session::MemoryScene;
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector3;

    fn registry() -> (NodeRegistry, MemoryScene) {
        let scene = MemoryScene::new();
        let registry = NodeRegistry::new(
            Box::new(scene.clone()),
            PlacementPolicy::default(),
            AnchorPlacementRule::default(),
        );
        (registry, scene)
    }

    fn camera() -> CameraState {
        CameraState {
            location: Some(GeoLocation::new(Coordinate::new(41.9028, 12.4964, 21.0), 4.0, 1_000).unwrap()),
            scene_position: Some(Vector3::new(0.0, 0.0, 0.0)),
        }
    }

    fn post(id: &str, north_m: f64) -> Post {
        let origin = Coordinate::new(41.9028, 12.4964, 21.0);
        let coordinates = coordinates::translate(&origin, &coordinates::LocalTranslation::new(0.0, north_m, 0.0));
        Post::new(id, coordinates).with_content(format!("post {}", id))
    }

    fn assert_consistent(registry: &NodeRegistry, scene: &MemoryScene) {
        assert_eq!(registry.ids(), scene.attached_ids());
        assert_eq!(scene.duplicate_attachments(), 0);
        assert_eq!(scene.orphan_operations(), 0);
    }

    #[test]
    fn test_upsert_twice_is_idempotent() {
        let (mut registry, scene) = registry();
        let camera = camera();

        assert_eq!(registry.upsert(post("a", 5.0), false, &camera, None), UpsertOutcome::Added);
        assert_eq!(registry.upsert(post("a", 5.0), false, &camera, None), UpsertOutcome::Updated);

        assert_eq!(registry.len(), 1);
        assert_eq!(scene.attach_calls(), 1);
        assert_consistent(&registry, &scene);
    }

    #[test]
    fn test_upsert_update_does_not_move_node() {
        let (mut registry, scene) = registry();
        let camera = camera();
        registry.upsert(post("a", 5.0), false, &camera, None);
        let before = scene.node("a").unwrap();

        let edited = post("a", 50.0).with_content("edited");
        registry.upsert(edited, false, &camera, None);

        let node = registry.get("a").unwrap();
        assert_eq!(node.post().content, "edited");
        assert_eq!(scene.node("a").unwrap(), before);
    }

    #[test]
    fn test_add_places_node_at_post_coordinates() {
        let (mut registry, scene) = registry();
        registry.upsert(post("a", 5.0), false, &camera(), None);

        let placed = scene.node("a").unwrap();
        assert_abs_diff_eq!(placed.placement.position.z, -5.0, epsilon = 1e-6);
        assert_eq!(placed.last_transition, None);
    }

    #[test]
    fn test_add_without_camera_location_attaches_at_origin() {
        let (mut registry, scene) = registry();
        registry.upsert(post("a", 5.0), false, &CameraState::default(), None);

        assert_eq!(scene.node("a").unwrap().placement, Placement::default());
        assert!(registry.get("a").unwrap().placement().is_none());
        assert_consistent(&registry, &scene);
    }

    #[test]
    fn test_add_replaces_existing_node() {
        let (mut registry, scene) = registry();
        let camera = camera();
        registry.add(PostLocationNode::new(post("a", 5.0)), &camera);
        registry.add(PostLocationNode::new(post("a", 8.0)), &camera);

        assert_eq!(registry.len(), 1);
        assert_abs_diff_eq!(scene.node("a").unwrap().placement.position.z, -8.0, epsilon = 1e-6);
        assert_consistent(&registry, &scene);
    }

    #[test]
    fn test_newly_authored_post_uses_anchor_rule() {
        let (mut registry, scene) = registry();
        let camera = camera();

        let outcome = registry.upsert(post("mine", 500.0), true, &camera, Some(0.0));

        assert_eq!(outcome, UpsertOutcome::Added);
        // One meter north of the camera, not 500
        assert_abs_diff_eq!(scene.node("mine").unwrap().placement.position.z, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_newly_authored_post_deferred_without_heading() {
        let (mut registry, scene) = registry();

        let outcome = registry.upsert(post("mine", 0.0), true, &camera(), None);

        assert_eq!(outcome, UpsertOutcome::Deferred);
        assert!(registry.is_empty());
        assert_eq!(scene.attach_calls(), 0);
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let (mut registry, scene) = registry();
        registry.upsert(post("a", 1.0), false, &camera(), None);

        assert!(!registry.remove("zzz"));
        assert!(registry.remove("a"));
        assert!(!registry.remove("a"));
        assert_eq!(scene.detach_calls(), 1);
        assert_consistent(&registry, &scene);
    }

    #[test]
    fn test_reconcile_removes_exactly_missing_ids() {
        let (mut registry, scene) = registry();
        let camera = camera();
        for (id, north) in [("A", 1.0), ("B", 2.0), ("C", 3.0)] {
            registry.upsert(post(id, north), false, &camera, None);
        }
        registry.reply_created("A", post("r1", 0.0));
        let a_before = scene.node("A").unwrap();
        let b_before = scene.node("B").unwrap();

        let keep: HashSet<String> = ["A", "B"].iter().map(|s| s.to_string()).collect();
        let removed = registry.reconcile_against(&keep);

        assert_eq!(removed, vec!["C".to_string()]);
        assert_eq!(registry.ids(), vec!["A".to_string(), "B".to_string()]);
        assert_eq!(scene.node("A").unwrap(), a_before);
        assert_eq!(scene.node("B").unwrap(), b_before);
        assert_eq!(registry.get("A").unwrap().replies().len(), 1);
        assert_consistent(&registry, &scene);
    }

    #[test]
    fn test_replies_for_unplaced_posts_are_dropped() {
        let (mut registry, _scene) = registry();
        registry.upsert(post("a", 1.0), false, &camera(), None);

        assert!(!registry.reply_created("ghost", post("r1", 0.0)));
        assert!(!registry.reply_reported("ghost", &post("r1", 0.0)));
        assert!(registry.reply_created("a", post("r1", 0.0)));
        assert!(registry.reply_reported("a", &post("r1", 0.0)));
        assert!(registry.get("a").unwrap().replies().is_empty());
    }

    #[test]
    fn test_tracked_nodes_follow_camera_with_animation() {
        let (mut registry, scene) = registry();
        let camera = camera();
        registry.upsert(post("moving", 5.0), false, &camera, None);
        registry.add(PostLocationNode::pinned(post("pinned", 5.0)), &camera);

        let moved = CameraState {
            scene_position: Some(Vector3::new(2.0, 0.0, 0.0)),
            ..camera
        };
        let updated = registry.update_tracked_nodes(&moved, Duration::from_millis(300));

        assert_eq!(updated, 1);
        let moving = scene.node("moving").unwrap();
        assert_abs_diff_eq!(moving.placement.position.x, 2.0, epsilon = 1e-6);
        assert_eq!(moving.last_transition, Some(Duration::from_millis(300)));
        assert_eq!(scene.node("pinned").unwrap().updates, 0);
    }

    #[test]
    fn test_tracked_update_without_location_changes_nothing() {
        let (mut registry, scene) = registry();
        registry.upsert(post("a", 5.0), false, &camera(), None);
        let before = scene.node("a").unwrap();
        let node_before = registry.get("a").unwrap().clone();

        let blind = CameraState {
            location: None,
            scene_position: Some(Vector3::new(9.0, 0.0, 0.0)),
        };
        assert_eq!(registry.update_tracked_nodes(&blind, Duration::from_millis(300)), 0);

        assert_eq!(scene.node("a").unwrap(), before);
        assert_eq!(registry.get("a").unwrap(), &node_before);
    }

    #[test]
    fn test_reset_all_detaches_everything() {
        let (mut registry, scene) = registry();
        let camera = camera();
        registry.upsert(post("a", 1.0), false, &camera, None);
        registry.upsert(post("b", 2.0), false, &camera, None);

        assert_eq!(registry.reset_all(), 2);
        assert!(registry.is_empty());
        assert_eq!(registry.attached_count(), 0);
        assert_consistent(&registry, &scene);
    }
}
