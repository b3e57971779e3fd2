//! Engine worker: sole owner of the estimate store and the node registry.

use crate::algorithms::{current_location, EstimateStore};
use crate::api::commands::Command;
use crate::api::shared_state::SharedState;
use crate::api::types::EngineSnapshot;
use crate::core::{Bearing, Post, ScenePosition};
use crate::scene::{CameraState, NodeRegistry, UpsertOutcome};
use crate::session::SceneGraph;
use crate::utils::EngineConfig;
use crossbeam_channel::Receiver;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

pub struct EngineWorker {
    store: EstimateStore,
    registry: NodeRegistry,
    heading: Option<Bearing>,
    animation_duration: Duration,
    reconcile_ticks: u64,
    shared: Arc<SharedState>,
}

impl EngineWorker {
    pub fn new(config: &EngineConfig, scene: Box<dyn SceneGraph>, shared: Arc<SharedState>) -> Self {
        Self {
            store: EstimateStore::new(config.scene_limit_m),
            registry: NodeRegistry::new(scene, config.placement_policy(), config.anchor_rule()),
            heading: None,
            animation_duration: config.animation_duration(),
            reconcile_ticks: 0,
            shared,
        }
    }

    /// Drain the queue until shutdown or until every sender is gone
    pub fn run(mut self, receiver: Receiver<Command>) {
        info!("scene location worker started");

        while let Ok(command) = receiver.recv() {
            if !self.handle(command) {
                break;
            }
        }

        info!(
            nodes = self.registry.len(),
            estimates = self.store.len(),
            "scene location worker stopped"
        );
    }

    /// Apply one command. Returns false on shutdown.
    pub fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::RecordEstimate { location, scene_position } => {
                self.store.record(location, scene_position.as_ref());
            }
            Command::UpdateHeading(heading) => {
                self.heading = Some(heading);
            }
            Command::PostCreated { post, scene_position } => {
                let camera = self.camera_state(scene_position);
                let post_id = post.id.clone();
                let outcome = self.registry.upsert(post, true, &camera, self.heading);
                debug!(post_id = %post_id, ?outcome, "authored post handled");
            }
            Command::PostsLoaded { posts, scene_position } => {
                self.load_posts(posts, scene_position);
            }
            Command::PostReported { post_id } => {
                self.registry.remove(&post_id);
            }
            Command::ReplyCreated { original_post_id, reply } => {
                self.registry.reply_created(&original_post_id, reply);
            }
            Command::ReplyReported { original_post_id, reply } => {
                self.registry.reply_reported(&original_post_id, &reply);
            }
            Command::Reconcile { scene_position } => {
                self.reconcile(scene_position);
            }
            Command::ResetPosts => {
                let removed = self.registry.reset_all();
                info!(removed, "all post nodes reset");
            }
            Command::ClearEstimates => {
                self.store.clear();
            }
            Command::ApplyConfig(config) => {
                self.apply_config(&config);
            }
            Command::ResolveSelection { candidate, reply } => {
                let _ = reply.send(self.resolve_selection(candidate));
            }
            Command::Snapshot { scene_position, reply } => {
                let _ = reply.send(self.snapshot(scene_position));
            }
            Command::Flush(reply) => {
                let _ = reply.send(());
            }
            Command::Shutdown => return false,
        }
        true
    }

    fn camera_state(&self, scene_position: Option<ScenePosition>) -> CameraState {
        CameraState {
            location: current_location(&self.store, scene_position.as_ref()),
            scene_position,
        }
    }

    fn load_posts(&mut self, posts: Vec<Post>, scene_position: Option<ScenePosition>) {
        let camera = self.camera_state(scene_position);
        let authoritative: HashSet<String> = posts.iter().map(|post| post.id.clone()).collect();

        let mut added = 0;
        for post in posts {
            if self.registry.upsert(post, false, &camera, self.heading) == UpsertOutcome::Added {
                added += 1;
            }
        }
        let removed = self.registry.reconcile_against(&authoritative);

        debug!(
            loaded = authoritative.len(),
            added,
            removed = removed.len(),
            "nearby posts reconciled"
        );
    }

    fn reconcile(&mut self, scene_position: Option<ScenePosition>) {
        self.shared.finish_tick();
        self.reconcile_ticks += 1;

        let Some(position) = scene_position else {
            trace!("reconcile tick without camera pose");
            return;
        };

        let pruned = self.store.prune(&position);
        let camera = self.camera_state(Some(position));
        let updated = self.registry.update_tracked_nodes(&camera, self.animation_duration);

        trace!(pruned, updated, estimates = self.store.len(), "reconcile tick");
    }

    fn apply_config(&mut self, config: &EngineConfig) {
        self.store.set_scene_limit(config.scene_limit_m);
        self.registry.set_policy(config.placement_policy());
        self.registry.set_anchor_rule(config.anchor_rule());
        self.animation_duration = config.animation_duration();
        debug!(?config, "engine configuration applied");
    }

    fn resolve_selection(&self, candidate: Option<String>) -> Option<String> {
        if self.registry.is_empty() {
            return None;
        }
        candidate.filter(|post_id| self.registry.contains(post_id))
    }

    fn snapshot(&self, scene_position: Option<ScenePosition>) -> EngineSnapshot {
        EngineSnapshot {
            estimate_count: self.store.len(),
            node_ids: self.registry.ids(),
            attached_count: self.registry.attached_count(),
            heading: self.heading,
            reconcile_ticks: self.reconcile_ticks,
            current_location: current_location(&self.store, scene_position.as_ref()),
        }
    }
}
