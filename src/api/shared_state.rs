//! State shared between callback threads, the ticker and the worker.
//!
//! Only snapshots live here: the latest camera pose and location fix, plus a
//! few flags. Everything the worker mutates stays on the worker thread.

use crate::core::{GeoLocation, ScenePosition};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct SharedState {
    /// Camera position from the most recent frame
    camera_position: RwLock<Option<ScenePosition>>,
    /// Most recent fix from the location provider
    last_location: RwLock<Option<GeoLocation>>,
    /// Set once the store has been seeded for the current session
    did_fetch_initial_location: AtomicBool,
    /// A reconcile command is queued and not yet processed
    tick_pending: AtomicBool,
    selection_enabled: AtomicBool,
}

impl SharedState {
    pub fn new(selection_enabled: bool) -> Arc<Self> {
        Arc::new(Self {
            camera_position: RwLock::new(None),
            last_location: RwLock::new(None),
            did_fetch_initial_location: AtomicBool::new(false),
            tick_pending: AtomicBool::new(false),
            selection_enabled: AtomicBool::new(selection_enabled),
        })
    }

    pub fn camera_position(&self) -> Option<ScenePosition> {
        *self.camera_position.read()
    }

    pub fn set_camera_position(&self, position: Option<ScenePosition>) {
        *self.camera_position.write() = position;
    }

    pub fn last_location(&self) -> Option<GeoLocation> {
        *self.last_location.read()
    }

    pub fn set_last_location(&self, location: GeoLocation) {
        *self.last_location.write() = Some(location);
    }

    pub fn did_fetch_initial_location(&self) -> bool {
        self.did_fetch_initial_location.load(Ordering::SeqCst)
    }

    /// Claim the one initial seed of this session. Returns true for the
    /// single caller that wins.
    pub fn claim_initial_location(&self) -> bool {
        self.did_fetch_initial_location
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Mark a reconcile as queued. Returns false if one already was.
    pub fn try_begin_tick(&self) -> bool {
        !self.tick_pending.swap(true, Ordering::SeqCst)
    }

    pub fn finish_tick(&self) {
        self.tick_pending.store(false, Ordering::SeqCst);
    }

    pub fn selection_enabled(&self) -> bool {
        self.selection_enabled.load(Ordering::SeqCst)
    }

    pub fn set_selection_enabled(&self, enabled: bool) {
        self.selection_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Forget everything tied to the previous session's scene frame
    pub fn reset_tracking(&self) {
        *self.camera_position.write() = None;
        self.did_fetch_initial_location.store(false, Ordering::SeqCst);
    }
}
