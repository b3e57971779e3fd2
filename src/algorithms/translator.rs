//! Frame translation between geographic coordinates and the scene frame.

use crate::algorithms::coordinates;
use crate::algorithms::estimate_store::EstimateStore;
use crate::core::{Coordinate, GeoLocation, ScenePosition, DEFAULT_FAR_PLACEMENT_DISTANCE_M};
use nalgebra::Vector3;

/// Where a node sits in the scene and how large it is drawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: ScenePosition,
    pub scale: f64,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            scale: 1.0,
        }
    }
}

/// Geographic location of the camera right now.
///
/// Requires both a best estimate and a current scene position. The best
/// estimate's fix is moved by the scene-space offset between where it was
/// recorded and where the camera is now.
pub fn current_location(
    store: &EstimateStore,
    current_scene_position: Option<&ScenePosition>,
) -> Option<GeoLocation> {
    let position = current_scene_position?;
    let best = store.best_estimate()?;

    Some(best.translated_location(position))
}

/// Rules turning a geographic target into a scene placement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementPolicy {
    /// Targets beyond this horizontal distance are pulled in and shrunk (meters)
    pub far_placement_distance_m: f64,
    /// Shrink near targets in proportion to their distance
    pub scale_relative_to_distance: bool,
}

impl Default for PlacementPolicy {
    fn default() -> Self {
        Self {
            far_placement_distance_m: DEFAULT_FAR_PLACEMENT_DISTANCE_M,
            scale_relative_to_distance: false,
        }
    }
}

impl PlacementPolicy {
    /// Placement of `target` given where the camera is, geographically and in
    /// the scene.
    pub fn placement_for(
        &self,
        target: &Coordinate,
        current_location: &GeoLocation,
        current_scene_position: &ScenePosition,
    ) -> Placement {
        let translation = coordinates::translation_between(&current_location.coordinate, target);
        let offset = translation.to_scene_offset();
        let distance = translation.horizontal_distance();

        if distance > self.far_placement_distance_m {
            // Keep direction and apparent size, but stay inside the renderable range
            let factor = self.far_placement_distance_m / distance;
            return Placement {
                position: current_scene_position + offset * factor,
                scale: factor,
            };
        }

        let scale = if self.scale_relative_to_distance {
            1.0 / distance.max(1.0)
        } else {
            1.0
        };

        Placement {
            position: current_scene_position + offset,
            scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::coordinates::{translate, LocalTranslation};
    use approx::assert_abs_diff_eq;

    fn fix(lat: f64, lon: f64, accuracy: f64, timestamp_ms: u64) -> GeoLocation {
        GeoLocation::new(Coordinate::new(lat, lon, 0.0), accuracy, timestamp_ms).unwrap()
    }

    #[test]
    fn test_current_location_requires_estimate_and_position() {
        let mut store = EstimateStore::default();
        let position = Vector3::new(0.0, 0.0, 0.0);

        assert!(current_location(&store, Some(&position)).is_none());

        store.record(fix(48.8584, 2.2945, 5.0, 1), Some(&position));
        assert!(current_location(&store, None).is_none());
        assert!(current_location(&store, Some(&position)).is_some());
    }

    #[test]
    fn test_current_location_zero_offset_round_trip() {
        let mut store = EstimateStore::default();
        let position = Vector3::new(2.0, 1.0, -3.0);
        let location = fix(48.8584, 2.2945, 5.0, 1);
        store.record(location, Some(&position));

        assert_eq!(current_location(&store, Some(&position)), Some(location));
    }

    #[test]
    fn test_current_location_follows_more_accurate_fix() {
        let mut store = EstimateStore::default();
        let origin = Vector3::zeros();
        let loc1 = fix(48.8584, 2.2945, 5.0, 1_000);
        let loc2 = fix(48.8585, 2.2946, 2.0, 1_000);

        store.record(loc1, Some(&origin));
        store.record(loc2, Some(&origin));

        let camera = Vector3::new(1.0, 0.0, 0.0);
        let current = current_location(&store, Some(&camera)).unwrap();
        let offset = coordinates::translation_between(&loc2.coordinate, &current.coordinate);

        assert_eq!(current.horizontal_accuracy, 2.0);
        assert_abs_diff_eq!(offset.east_m, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(offset.north_m, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_placement_of_near_target() {
        let policy = PlacementPolicy::default();
        let camera_location = fix(40.7128, -74.0060, 3.0, 0);
        let camera_position = Vector3::new(1.0, 1.5, 2.0);
        let target = translate(&camera_location.coordinate, &LocalTranslation::new(4.0, 3.0, 0.0));

        let placement = policy.placement_for(&target, &camera_location, &camera_position);

        assert_abs_diff_eq!(placement.position.x, 5.0, epsilon = 1e-6);
        assert_abs_diff_eq!(placement.position.y, 1.5, epsilon = 1e-6);
        assert_abs_diff_eq!(placement.position.z, -1.0, epsilon = 1e-6);
        assert_eq!(placement.scale, 1.0);
    }

    #[test]
    fn test_placement_of_far_target_is_clamped() {
        let policy = PlacementPolicy::default();
        let camera_location = fix(40.7128, -74.0060, 3.0, 0);
        let target = translate(&camera_location.coordinate, &LocalTranslation::new(0.0, 400.0, 0.0));

        let placement = policy.placement_for(&target, &camera_location, &Vector3::zeros());

        assert_abs_diff_eq!(placement.position.z, -100.0, epsilon = 1e-4);
        assert_abs_diff_eq!(placement.scale, 0.25, epsilon = 1e-6);
    }

    #[test]
    fn test_placement_scales_relative_to_distance() {
        let policy = PlacementPolicy {
            scale_relative_to_distance: true,
            ..Default::default()
        };
        let camera_location = fix(40.7128, -74.0060, 3.0, 0);
        let near = translate(&camera_location.coordinate, &LocalTranslation::new(0.5, 0.0, 0.0));
        let mid = translate(&camera_location.coordinate, &LocalTranslation::new(8.0, 0.0, 0.0));

        let near_placement = policy.placement_for(&near, &camera_location, &Vector3::zeros());
        let mid_placement = policy.placement_for(&mid, &camera_location, &Vector3::zeros());

        assert_eq!(near_placement.scale, 1.0);
        assert_abs_diff_eq!(mid_placement.scale, 0.125, epsilon = 1e-6);
    }
}
