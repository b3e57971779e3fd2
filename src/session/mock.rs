//! In-memory tracking session and scene graph for testing and development.
//!
//! Both types are cheap handles over shared state, so a test can keep a clone
//! while the engine's worker owns the other.

use crate::algorithms::Placement;
use crate::core::ScreenPoint;
use crate::session::{SceneGraph, SessionConfiguration, TrackingSession};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Circular screen region that resolves to a post id on hit test
#[derive(Debug, Clone, PartialEq)]
pub struct HitRegion {
    pub center: ScreenPoint,
    pub radius: f64,
    pub post_id: String,
}

impl HitRegion {
    fn contains(&self, point: &ScreenPoint) -> bool {
        (point.x - self.center.x).hypot(point.y - self.center.y) <= self.radius
    }
}

/// Observable state of a [`MockTrackingSession`]
#[derive(Debug, Clone, Default)]
pub struct MockSessionState {
    pub running: bool,
    pub starts: u32,
    pub pauses: u32,
    pub resets: u32,
    pub last_configuration: Option<SessionConfiguration>,
    pub hit_regions: Vec<HitRegion>,
}

/// Tracking session that records lifecycle calls
#[derive(Debug, Clone, Default)]
pub struct MockTrackingSession {
    state: Arc<Mutex<MockSessionState>>,
}

impl MockTrackingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make taps inside the circle resolve to `post_id`
    pub fn add_hit_region(&self, center: ScreenPoint, radius: f64, post_id: impl Into<String>) {
        self.state.lock().hit_regions.push(HitRegion {
            center,
            radius,
            post_id: post_id.into(),
        });
    }

    pub fn clear_hit_regions(&self) {
        self.state.lock().hit_regions.clear();
    }

    pub fn state(&self) -> MockSessionState {
        self.state.lock().clone()
    }
}

impl TrackingSession for MockTrackingSession {
    fn start(&mut self, configuration: &SessionConfiguration) {
        let mut state = self.state.lock();
        state.running = true;
        state.starts += 1;
        state.last_configuration = Some(configuration.clone());
    }

    fn pause(&mut self) {
        let mut state = self.state.lock();
        state.running = false;
        state.pauses += 1;
    }

    fn reset(&mut self) {
        let mut state = self.state.lock();
        state.running = false;
        state.resets += 1;
    }

    fn hit_test(&self, point: ScreenPoint) -> Option<String> {
        self.state
            .lock()
            .hit_regions
            .iter()
            .find(|region| region.contains(&point))
            .map(|region| region.post_id.clone())
    }
}

/// Rendered state of one node in a [`MemoryScene`]
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNodeState {
    pub placement: Placement,
    /// Transition used by the most recent update, `None` for a snap
    pub last_transition: Option<Duration>,
    pub updates: u32,
}

#[derive(Debug, Default)]
struct MemorySceneInner {
    nodes: HashMap<String, SceneNodeState>,
    attach_calls: u32,
    detach_calls: u32,
    /// Attach calls for ids that were already attached
    duplicate_attachments: u32,
    /// Updates or detaches for ids that were never attached
    orphan_operations: u32,
}

/// Scene graph kept entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryScene {
    inner: Arc<Mutex<MemorySceneInner>>,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attached ids in sorted order
    pub fn attached_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.lock().nodes.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn node(&self, id: &str) -> Option<SceneNodeState> {
        self.inner.lock().nodes.get(id).cloned()
    }

    pub fn attach_calls(&self) -> u32 {
        self.inner.lock().attach_calls
    }

    pub fn detach_calls(&self) -> u32 {
        self.inner.lock().detach_calls
    }

    pub fn duplicate_attachments(&self) -> u32 {
        self.inner.lock().duplicate_attachments
    }

    pub fn orphan_operations(&self) -> u32 {
        self.inner.lock().orphan_operations
    }
}

impl SceneGraph for MemoryScene {
    fn attach(&mut self, id: &str, placement: &Placement) {
        let mut inner = self.inner.lock();
        inner.attach_calls += 1;
        let previous = inner.nodes.insert(
            id.to_string(),
            SceneNodeState {
                placement: *placement,
                last_transition: None,
                updates: 0,
            },
        );
        if previous.is_some() {
            inner.duplicate_attachments += 1;
        }
    }

    fn detach(&mut self, id: &str) {
        let mut inner = self.inner.lock();
        inner.detach_calls += 1;
        if inner.nodes.remove(id).is_none() {
            inner.orphan_operations += 1;
        }
    }

    fn apply(&mut self, id: &str, placement: &Placement, transition: Option<Duration>) {
        let mut inner = self.inner.lock();
        match inner.nodes.get_mut(id) {
            Some(node) => {
                node.placement = *placement;
                node.last_transition = transition;
                node.updates += 1;
            }
            None => inner.orphan_operations += 1,
        }
    }

    fn attached_count(&self) -> usize {
        self.inner.lock().nodes.len()
    }
}
