//! Rolling store of geo/scene correspondences.
//!
//! Each estimate pairs a geographic fix with the camera scene position at the
//! moment the fix was accepted. The store is pruned on every reconciliation
//! tick so that only samples near the camera survive; far samples are the ones
//! most invalidated by tracking drift.

use crate::algorithms::coordinates::{self, LocalTranslation};
use crate::algorithms::selection;
use crate::core::{GeoLocation, ScenePosition, DEFAULT_SCENE_LIMIT_M};
use tracing::debug;

/// A scene position asserted to correspond to a geographic location
#[derive(Debug, Clone, PartialEq)]
pub struct GeoSceneEstimate {
    pub location: GeoLocation,
    pub scene_position: ScenePosition,
}

impl GeoSceneEstimate {
    pub fn new(location: GeoLocation, scene_position: ScenePosition) -> Self {
        Self {
            location,
            scene_position,
        }
    }

    /// Location obtained by moving this estimate's fix by the scene-space offset
    /// from its recorded position to `position`.
    ///
    /// Accuracy and timestamp are carried over from the original fix.
    pub fn translated_location(&self, position: &ScenePosition) -> GeoLocation {
        let offset = position - self.scene_position;
        let translation = LocalTranslation::from_scene_offset(&offset);
        let coordinate = coordinates::translate(&self.location.coordinate, &translation);

        self.location.with_coordinate(coordinate)
    }
}

/// Spatially pruned collection of estimates
#[derive(Debug, Clone)]
pub struct EstimateStore {
    estimates: Vec<GeoSceneEstimate>,
    scene_limit_m: f64,
}

impl Default for EstimateStore {
    fn default() -> Self {
        Self::new(DEFAULT_SCENE_LIMIT_M)
    }
}

impl EstimateStore {
    pub fn new(scene_limit_m: f64) -> Self {
        Self {
            estimates: Vec::new(),
            scene_limit_m,
        }
    }

    /// Record a fix against the current camera scene position.
    ///
    /// The fix is dropped when no scene position is available. Returns whether
    /// it was kept.
    pub fn record(&mut self, location: GeoLocation, current_scene_position: Option<&ScenePosition>) -> bool {
        match current_scene_position {
            Some(position) => {
                self.estimates.push(GeoSceneEstimate::new(location, *position));
                true
            }
            None => {
                debug!(
                    timestamp_ms = location.timestamp_ms,
                    "dropping location fix without a scene position"
                );
                false
            }
        }
    }

    /// Evict every estimate farther than the scene limit (horizontally) from
    /// `current_scene_position`. Returns the number evicted.
    pub fn prune(&mut self, current_scene_position: &ScenePosition) -> usize {
        let before = self.estimates.len();
        let limit = self.scene_limit_m;

        self.estimates.retain(|estimate| {
            coordinates::horizontal_scene_distance(&estimate.scene_position, current_scene_position) <= limit
        });

        let evicted = before - self.estimates.len();
        if evicted > 0 {
            debug!(evicted, remaining = self.estimates.len(), "pruned stale estimates");
        }
        evicted
    }

    /// Most trustworthy estimate currently held
    pub fn best_estimate(&self) -> Option<&GeoSceneEstimate> {
        selection::select_best(&self.estimates)
    }

    pub fn estimates(&self) -> &[GeoSceneEstimate] {
        &self.estimates
    }

    pub fn len(&self) -> usize {
        self.estimates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.estimates.is_empty()
    }

    pub fn scene_limit(&self) -> f64 {
        self.scene_limit_m
    }

    /// Change the trust radius; takes effect at the next prune
    pub fn set_scene_limit(&mut self, scene_limit_m: f64) {
        self.scene_limit_m = scene_limit_m;
    }

    pub fn clear(&mut self) {
        self.estimates.clear();
    }
}
