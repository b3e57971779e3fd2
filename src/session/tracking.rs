//! Tracking session interface and configuration

use crate::core::ScreenPoint;
use serde::{Deserialize, Serialize};

/// How the session orients its scene frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorldAlignment {
    /// Y axis opposes gravity, X/Z follow the initial device orientation
    Gravity,
    /// Y axis opposes gravity, -Z points to true north, +X to east
    GravityAndHeading,
    /// Scene frame fixed to the camera
    Camera,
}

/// Options passed when (re)starting a tracking session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfiguration {
    pub world_alignment: WorldAlignment,
    /// Discard the previous tracking state and origin
    pub reset_tracking: bool,
    /// Drop anchors the session placed itself
    pub remove_existing_anchors: bool,
}

impl SessionConfiguration {
    /// World tracking aligned to gravity and compass heading, started fresh.
    ///
    /// Geo translation relies on the east/up/south axis convention, so this is
    /// the only configuration the engine starts sessions with.
    pub fn world_tracking() -> Self {
        Self {
            world_alignment: WorldAlignment::GravityAndHeading,
            reset_tracking: true,
            remove_existing_anchors: true,
        }
    }
}

impl Default for SessionConfiguration {
    fn default() -> Self {
        Self::world_tracking()
    }
}

/// The rendering/tracking collaborator
pub trait TrackingSession: Send {
    /// Start or resume tracking with the given configuration
    fn start(&mut self, configuration: &SessionConfiguration);

    /// Suspend tracking; camera frames stop arriving
    fn pause(&mut self);

    /// Throw away the tracking state; the scene origin moves
    fn reset(&mut self);

    /// Post id of the topmost post node under `point`, if any
    fn hit_test(&self, point: ScreenPoint) -> Option<String>;
}
