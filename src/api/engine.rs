//! Public engine facade.
//!
//! Callbacks from the tracking session, the location provider and the post
//! feed may arrive on any thread. They update the shared snapshots and push
//! commands onto one ordered queue; a single worker thread applies them. A
//! ticker thread enqueues a reconcile command every period while the session
//! runs, never more than one at a time.

use crate::api::commands::Command;
use crate::api::shared_state::SharedState;
use crate::api::types::{EngineError, EngineResult, EngineSnapshot};
use crate::api::worker::EngineWorker;
use crate::core::{Bearing, GeoLocation, Post, ScenePosition, ScreenPoint};
use crate::session::{SceneGraph, SessionConfiguration, TrackingSession};
use crate::utils::EngineConfig;
use crossbeam_channel::{bounded, select, tick, unbounded, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Periodic reconcile trigger
struct Ticker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl Ticker {
    fn spawn(period: Duration, shared: Arc<SharedState>, commands: Sender<Command>) -> EngineResult<Self> {
        let (stop, stop_rx) = bounded::<()>(0);

        let handle = thread::Builder::new()
            .name("scene-location-ticker".to_string())
            .spawn(move || {
                let ticks = tick(period);
                loop {
                    let stopped = select! {
                        recv(ticks) -> _ => false,
                        recv(stop_rx) -> _ => true,
                    };
                    if stopped {
                        break;
                    }
                    if !shared.try_begin_tick() {
                        trace!("previous reconcile still queued, skipping tick");
                        continue;
                    }
                    let scene_position = shared.camera_position();
                    if commands.send(Command::Reconcile { scene_position }).is_err() {
                        break;
                    }
                }
            })
            .map_err(|source| EngineError::Spawn { name: "ticker", source })?;

        Ok(Self { stop, handle })
    }

    fn stop(self) {
        drop(self.stop);
        if self.handle.join().is_err() {
            warn!("ticker thread panicked");
        }
    }
}

pub struct SceneLocationEngine {
    config: Mutex<EngineConfig>,
    shared: Arc<SharedState>,
    session: Mutex<Box<dyn TrackingSession>>,
    commands: Sender<Command>,
    worker: Option<JoinHandle<()>>,
    ticker: Mutex<Option<Ticker>>,
    /// Held while claiming the initial seed and while resetting the session
    seed_gate: Mutex<()>,
}

impl SceneLocationEngine {
    /// Validate `config` and start the worker. The session is not started
    /// until [`run`](Self::run).
    pub fn new(
        config: EngineConfig,
        session: Box<dyn TrackingSession>,
        scene: Box<dyn SceneGraph>,
    ) -> EngineResult<Self> {
        config.validate()?;

        let shared = SharedState::new(config.selection_enabled);
        let (commands, receiver) = unbounded();
        let worker = EngineWorker::new(&config, scene, shared.clone());

        let handle = thread::Builder::new()
            .name("scene-location-worker".to_string())
            .spawn(move || worker.run(receiver))
            .map_err(|source| EngineError::Spawn { name: "worker", source })?;

        Ok(Self {
            config: Mutex::new(config),
            shared,
            session: Mutex::new(session),
            commands,
            worker: Some(handle),
            ticker: Mutex::new(None),
            seed_gate: Mutex::new(()),
        })
    }

    pub fn config(&self) -> EngineConfig {
        self.config.lock().clone()
    }

    /// Per-frame callback with the camera position, or `None` when tracking
    /// has no pose.
    ///
    /// The first frame with a pose seeds the store once per session with the
    /// most recent location fix.
    pub fn on_frame(&self, camera_position: Option<ScenePosition>) -> EngineResult<()> {
        self.shared.set_camera_position(camera_position);

        let Some(position) = camera_position else {
            return Ok(());
        };
        if self.shared.did_fetch_initial_location() {
            return Ok(());
        }
        let Some(location) = self.shared.last_location() else {
            return Ok(());
        };

        let _gate = self.seed_gate.lock();
        if self.shared.claim_initial_location() {
            debug!(accuracy = location.horizontal_accuracy, "seeding initial location estimate");
            self.enqueue(Command::RecordEstimate {
                location,
                scene_position: Some(position),
            })?;
        }
        Ok(())
    }

    /// Location provider callback. Fixes arriving without a camera pose are
    /// remembered for the initial seed but not recorded.
    pub fn on_location_update(&self, location: GeoLocation) -> EngineResult<()> {
        let location = GeoLocation::new(location.coordinate, location.horizontal_accuracy, location.timestamp_ms)?;
        self.shared.set_last_location(location);

        let _gate = self.seed_gate.lock();
        let scene_position = self.shared.camera_position();
        if scene_position.is_some() {
            // A pose-paired fix makes the initial seed redundant
            self.shared.claim_initial_location();
        }
        self.enqueue(Command::RecordEstimate { location, scene_position })
    }

    /// Compass callback, degrees clockwise from true north
    pub fn on_heading_update(&self, heading: Bearing) -> EngineResult<()> {
        if !heading.is_finite() {
            debug!(heading, "ignoring non-finite heading");
            return Ok(());
        }
        self.enqueue(Command::UpdateHeading(heading.rem_euclid(360.0)))
    }

    /// A post authored on this device; sited in front of the camera
    pub fn on_post_created(&self, post: Post) -> EngineResult<()> {
        self.enqueue(Command::PostCreated {
            post,
            scene_position: self.shared.camera_position(),
        })
    }

    /// The feed's authoritative list of nearby posts
    pub fn on_posts_loaded(&self, posts: Vec<Post>) -> EngineResult<()> {
        self.enqueue(Command::PostsLoaded {
            posts,
            scene_position: self.shared.camera_position(),
        })
    }

    pub fn on_post_reported(&self, post: Post) -> EngineResult<()> {
        self.enqueue(Command::PostReported { post_id: post.id })
    }

    pub fn on_reply_created(&self, original_post_id: &str, reply: Post) -> EngineResult<()> {
        self.enqueue(Command::ReplyCreated {
            original_post_id: original_post_id.to_string(),
            reply,
        })
    }

    pub fn on_reply_reported(&self, original_post_id: &str, reply: Post) -> EngineResult<()> {
        self.enqueue(Command::ReplyReported {
            original_post_id: original_post_id.to_string(),
            reply,
        })
    }

    /// Post id of the node under a tap, if selection is enabled and the hit
    /// resolves to a registered node.
    pub fn selected_node(&self, point: ScreenPoint) -> EngineResult<Option<String>> {
        if !self.shared.selection_enabled() {
            return Ok(None);
        }

        let candidate = self.session.lock().hit_test(point);
        if candidate.is_none() {
            return Ok(None);
        }

        self.request(|reply| Command::ResolveSelection { candidate, reply })
    }

    pub fn set_selection_enabled(&self, enabled: bool) {
        self.shared.set_selection_enabled(enabled);
        self.config.lock().selection_enabled = enabled;
    }

    /// Start or resume the session and the reconciliation loop
    pub fn run(&self) -> EngineResult<()> {
        self.session.lock().start(&SessionConfiguration::world_tracking());
        self.restart_ticker()?;
        info!("scene location session running");
        Ok(())
    }

    /// Pause the session and stop the reconciliation loop
    pub fn pause(&self) {
        self.stop_ticker();
        self.session.lock().pause();
        info!("scene location session paused");
    }

    /// Reset tracking, discard estimates tied to the old scene frame and
    /// start again.
    pub fn reset_session(&self) -> EngineResult<()> {
        self.stop_ticker();
        self.session.lock().reset();
        {
            // Clear before re-arming the seed, so a racing frame can only
            // seed into the new session
            let _gate = self.seed_gate.lock();
            self.enqueue(Command::ClearEstimates)?;
            self.shared.reset_tracking();
        }
        info!("scene location session reset");
        self.run()
    }

    /// Remove every post node
    pub fn reset_posts(&self) -> EngineResult<()> {
        self.enqueue(Command::ResetPosts)
    }

    /// Queue a reconcile now unless one is already pending
    pub fn reconcile_now(&self) -> EngineResult<()> {
        if !self.shared.try_begin_tick() {
            return Ok(());
        }
        self.enqueue(Command::Reconcile {
            scene_position: self.shared.camera_position(),
        })
    }

    /// Validate and apply new tuning. A running loop picks up the new period.
    pub fn update_config(&self, config: EngineConfig) -> EngineResult<()> {
        config.validate()?;

        let period_changed = self.config.lock().reconcile_period_ms != config.reconcile_period_ms;
        self.shared.set_selection_enabled(config.selection_enabled);
        self.enqueue(Command::ApplyConfig(config.clone()))?;
        *self.config.lock() = config;

        if period_changed && self.is_running() {
            self.restart_ticker()?;
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.ticker.lock().is_some()
    }

    /// Camera location from the best estimate and the latest frame
    pub fn current_location(&self) -> EngineResult<Option<GeoLocation>> {
        Ok(self.snapshot()?.current_location)
    }

    pub fn snapshot(&self) -> EngineResult<EngineSnapshot> {
        let scene_position = self.shared.camera_position();
        self.request(|reply| Command::Snapshot { scene_position, reply })
    }

    /// Block until every previously queued command has been applied
    pub fn flush(&self) -> EngineResult<()> {
        self.request(Command::Flush)
    }

    /// Stop the ticker and the worker. Later calls fail with
    /// [`EngineError::WorkerUnavailable`].
    pub fn shutdown(&mut self) -> EngineResult<()> {
        self.stop_ticker();

        let Some(handle) = self.worker.take() else {
            return Ok(());
        };
        let _ = self.commands.send(Command::Shutdown);
        handle.join().map_err(|_| EngineError::WorkerPanicked)
    }

    fn enqueue(&self, command: Command) -> EngineResult<()> {
        if self.worker.is_none() {
            return Err(EngineError::WorkerUnavailable);
        }
        self.commands.send(command).map_err(|_| EngineError::WorkerUnavailable)
    }

    fn request<T>(&self, build: impl FnOnce(Sender<T>) -> Command) -> EngineResult<T> {
        let (reply, response) = bounded(1);
        self.enqueue(build(reply))?;
        response.recv().map_err(|_| EngineError::WorkerUnavailable)
    }

    fn restart_ticker(&self) -> EngineResult<()> {
        let period = self.config.lock().reconcile_period();
        let mut ticker = self.ticker.lock();
        if let Some(previous) = ticker.take() {
            previous.stop();
        }
        *ticker = Some(Ticker::spawn(period, self.shared.clone(), self.commands.clone())?);
        Ok(())
    }

    fn stop_ticker(&self) {
        if let Some(ticker) = self.ticker.lock().take() {
            ticker.stop();
        }
    }
}

impl Drop for SceneLocationEngine {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("engine shutdown failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Coordinate;
    use crate::session::{MemoryScene, MockTrackingSession};
    use approx::assert_relative_eq;
    use crossbeam_channel::TryRecvError;
    use nalgebra::Vector3;

    fn engine_with(config: EngineConfig) -> (SceneLocationEngine, MockTrackingSession, MemoryScene) {
        let session = MockTrackingSession::new();
        let scene = MemoryScene::new();
        let engine =
            SceneLocationEngine::new(config, Box::new(session.clone()), Box::new(scene.clone())).unwrap();
        (engine, session, scene)
    }

    fn engine() -> (SceneLocationEngine, MockTrackingSession, MemoryScene) {
        engine_with(EngineConfig::default())
    }

    fn fix(latitude: f64, longitude: f64, accuracy: f64, timestamp_ms: u64) -> GeoLocation {
        GeoLocation::new(Coordinate::new(latitude, longitude, 0.0), accuracy, timestamp_ms).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = EngineConfig {
            scene_limit_m: -1.0,
            ..EngineConfig::default()
        };
        let result = SceneLocationEngine::new(
            config,
            Box::new(MockTrackingSession::new()),
            Box::new(MemoryScene::new()),
        );
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_location_without_frame_is_not_recorded() {
        let (engine, _, _) = engine();

        engine.on_location_update(fix(47.0, 8.0, 5.0, 1)).unwrap();
        let snapshot = engine.snapshot().unwrap();

        assert_eq!(snapshot.estimate_count, 0);
        assert_eq!(snapshot.current_location, None);
    }

    #[test]
    fn test_initial_seed_happens_once() {
        let (engine, _, _) = engine();

        engine.on_location_update(fix(47.0, 8.0, 5.0, 1)).unwrap();
        engine.on_frame(Some(Vector3::zeros())).unwrap();
        engine.on_frame(Some(Vector3::new(0.1, 0.0, 0.0))).unwrap();
        engine.on_frame(Some(Vector3::new(0.2, 0.0, 0.0))).unwrap();

        assert_eq!(engine.snapshot().unwrap().estimate_count, 1);
    }

    #[test]
    fn test_frame_without_pose_does_not_seed() {
        let (engine, _, _) = engine();

        engine.on_location_update(fix(47.0, 8.0, 5.0, 1)).unwrap();
        engine.on_frame(None).unwrap();

        assert_eq!(engine.snapshot().unwrap().estimate_count, 0);
    }

    #[test]
    fn test_current_location_follows_camera() {
        let (engine, _, _) = engine();

        engine.on_frame(Some(Vector3::zeros())).unwrap();
        engine.on_location_update(fix(47.0, 8.0, 5.0, 1)).unwrap();
        engine.on_frame(Some(Vector3::new(0.0, 0.0, -2.0))).unwrap();

        let location = engine.current_location().unwrap().unwrap();
        assert!(location.coordinate.latitude > 47.0);
        assert_relative_eq!(location.coordinate.longitude, 8.0, epsilon = 1e-9);
        assert_eq!(location.horizontal_accuracy, 5.0);
    }

    #[test]
    fn test_invalid_location_rejected() {
        let (engine, _, _) = engine();
        let mut location = fix(47.0, 8.0, 5.0, 1);
        location.coordinate.latitude = 120.0;

        assert!(matches!(
            engine.on_location_update(location),
            Err(EngineError::Location(_))
        ));
    }

    #[test]
    fn test_feed_events_flow_to_scene() {
        let (engine, _, scene) = engine();
        let near = Coordinate::new(47.0001, 8.0, 0.0);

        engine.on_frame(Some(Vector3::zeros())).unwrap();
        engine.on_location_update(fix(47.0, 8.0, 5.0, 1)).unwrap();
        engine
            .on_posts_loaded(vec![Post::new("a", near), Post::new("b", near)])
            .unwrap();
        engine.on_reply_created("a", Post::new("r1", near)).unwrap();
        engine.on_post_reported(Post::new("b", near)).unwrap();
        engine.flush().unwrap();

        assert_eq!(scene.attached_ids(), vec!["a".to_string()]);
        assert_eq!(scene.orphan_operations(), 0);
        assert_eq!(scene.duplicate_attachments(), 0);
    }

    #[test]
    fn test_created_post_uses_heading() {
        let (engine, _, scene) = engine();

        engine.on_frame(Some(Vector3::zeros())).unwrap();
        engine.on_location_update(fix(47.0, 8.0, 5.0, 1)).unwrap();
        engine.on_heading_update(450.0).unwrap();
        engine
            .on_post_created(Post::new("mine", Coordinate::new(0.0, 0.0, 0.0)))
            .unwrap();
        engine.flush().unwrap();

        // 450 degrees normalises to due east: scene +x
        let placement = scene.node("mine").unwrap().placement;
        assert!((placement.position.x - 1.0).abs() < 0.05);
        assert!(placement.position.z.abs() < 0.05);
        assert_eq!(engine.snapshot().unwrap().heading, Some(90.0));
    }

    #[test]
    fn test_selection_gating() {
        let (engine, session, _) = engine();
        let point = ScreenPoint::new(100.0, 100.0);
        session.add_hit_region(point, 10.0, "a");

        // Nothing registered yet
        assert_eq!(engine.selected_node(point).unwrap(), None);

        engine
            .on_posts_loaded(vec![Post::new("a", Coordinate::new(47.0, 8.0, 0.0))])
            .unwrap();
        assert_eq!(engine.selected_node(point).unwrap(), Some("a".to_string()));
        assert_eq!(engine.selected_node(ScreenPoint::new(400.0, 400.0)).unwrap(), None);

        engine.set_selection_enabled(false);
        assert_eq!(engine.selected_node(point).unwrap(), None);
        assert!(!engine.config().selection_enabled);
    }

    #[test]
    fn test_run_and_pause_drive_session() {
        let (engine, session, _) = engine();

        engine.run().unwrap();
        assert!(engine.is_running());
        engine.pause();
        assert!(!engine.is_running());

        let state = session.state();
        assert_eq!(state.starts, 1);
        assert_eq!(state.pauses, 1);
        assert!(!state.running);
        assert_eq!(state.last_configuration, Some(SessionConfiguration::world_tracking()));
    }

    #[test]
    fn test_ticker_reconciles_nodes() {
        let config = EngineConfig {
            reconcile_period_ms: 10,
            ..EngineConfig::default()
        };
        let (engine, _, scene) = engine_with(config);
        let near = Coordinate::new(47.0001, 8.0, 0.0);

        engine.on_frame(Some(Vector3::zeros())).unwrap();
        engine.on_location_update(fix(47.0, 8.0, 5.0, 1)).unwrap();
        engine.on_posts_loaded(vec![Post::new("a", near)]).unwrap();
        engine.run().unwrap();

        thread::sleep(Duration::from_millis(200));
        engine.pause();
        engine.flush().unwrap();

        assert!(engine.snapshot().unwrap().reconcile_ticks > 0);
        let node = scene.node("a").unwrap();
        assert!(node.updates > 0);
        assert_eq!(node.last_transition, Some(Duration::from_millis(300)));
    }

    #[test]
    fn test_reconcile_now_prunes_distant_estimates() {
        let (engine, _, _) = engine();

        engine.on_frame(Some(Vector3::zeros())).unwrap();
        engine.on_location_update(fix(47.0, 8.0, 5.0, 1)).unwrap();
        engine.on_frame(Some(Vector3::new(30.0, 0.0, 0.0))).unwrap();
        engine.reconcile_now().unwrap();

        let snapshot = engine.snapshot().unwrap();
        assert_eq!(snapshot.estimate_count, 0);
        assert_eq!(snapshot.current_location, None);
    }

    #[test]
    fn test_reset_session_clears_estimates_and_reseeds() {
        let (engine, session, _) = engine();

        engine.on_location_update(fix(47.0, 8.0, 5.0, 1)).unwrap();
        engine.on_frame(Some(Vector3::zeros())).unwrap();
        assert_eq!(engine.snapshot().unwrap().estimate_count, 1);

        engine.reset_session().unwrap();
        assert_eq!(engine.snapshot().unwrap().estimate_count, 0);
        assert_eq!(engine.current_location().unwrap(), None);

        engine.on_frame(Some(Vector3::zeros())).unwrap();
        assert_eq!(engine.snapshot().unwrap().estimate_count, 1);

        let state = session.state();
        assert_eq!(state.resets, 1);
        assert_eq!(state.starts, 1);
        engine.pause();
    }

    #[test]
    fn test_frame_racing_reset_keeps_new_session_seed() {
        let (engine, _, _) = engine();

        engine.on_location_update(fix(47.0, 8.0, 5.0, 1)).unwrap();
        engine.on_frame(Some(Vector3::zeros())).unwrap();

        // Same order as reset_session, with a render frame landing between
        // the queued clear and the re-armed seed
        engine.enqueue(Command::ClearEstimates).unwrap();
        engine.on_frame(Some(Vector3::zeros())).unwrap();
        engine.shared.reset_tracking();

        for _ in 0..10 {
            engine.on_frame(Some(Vector3::zeros())).unwrap();
        }
        assert_eq!(engine.snapshot().unwrap().estimate_count, 1);
    }

    #[test]
    fn test_reset_session_under_concurrent_frames() {
        let (engine, _, _) = engine();
        let engine = Arc::new(engine);
        engine.on_location_update(fix(47.0, 8.0, 5.0, 1)).unwrap();

        let (stop, stopped) = bounded::<()>(0);
        let renderer = {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                while matches!(stopped.try_recv(), Err(TryRecvError::Empty)) {
                    engine.on_frame(Some(Vector3::zeros())).unwrap();
                }
            })
        };

        for _ in 0..50 {
            engine.reset_session().unwrap();
        }
        drop(stop);
        renderer.join().unwrap();

        engine.on_frame(Some(Vector3::zeros())).unwrap();
        assert_eq!(engine.snapshot().unwrap().estimate_count, 1);
        engine.pause();
    }

    #[test]
    fn test_reset_posts_detaches_everything() {
        let (engine, _, scene) = engine();
        let near = Coordinate::new(47.0001, 8.0, 0.0);

        engine
            .on_posts_loaded(vec![Post::new("a", near), Post::new("b", near)])
            .unwrap();
        engine.reset_posts().unwrap();
        engine.flush().unwrap();

        assert!(scene.attached_ids().is_empty());
        assert!(engine.snapshot().unwrap().node_ids.is_empty());
    }

    #[test]
    fn test_update_config_applies_scene_limit() {
        let (engine, _, _) = engine();

        engine.on_frame(Some(Vector3::zeros())).unwrap();
        engine.on_location_update(fix(47.0, 8.0, 5.0, 1)).unwrap();
        engine
            .update_config(EngineConfig {
                scene_limit_m: 50.0,
                ..EngineConfig::default()
            })
            .unwrap();
        engine.on_frame(Some(Vector3::new(30.0, 0.0, 0.0))).unwrap();
        engine.reconcile_now().unwrap();

        assert_eq!(engine.snapshot().unwrap().estimate_count, 1);
        assert_eq!(engine.config().scene_limit_m, 50.0);
    }

    #[test]
    fn test_calls_after_shutdown_fail() {
        let (mut engine, _, _) = engine();

        engine.shutdown().unwrap();
        assert!(matches!(engine.flush(), Err(EngineError::WorkerUnavailable)));
        assert!(matches!(
            engine.on_heading_update(10.0),
            Err(EngineError::WorkerUnavailable)
        ));
        assert!(engine.shutdown().is_ok());
    }
}
