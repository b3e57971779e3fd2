//! Siting of content authored by the local user.
//!
//! New content appears a short distance in front of the camera along the
//! compass heading, so it is immediately visible without occluding the view.

use crate::algorithms::coordinates;
use crate::core::{Bearing, Coordinate, GeoLocation, DEFAULT_ANCHOR_SHIFT_M};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorPlacementRule {
    /// Distance along the heading (meters)
    pub shift_m: f64,
}

impl Default for AnchorPlacementRule {
    fn default() -> Self {
        Self {
            shift_m: DEFAULT_ANCHOR_SHIFT_M,
        }
    }
}

impl AnchorPlacementRule {
    pub fn new(shift_m: f64) -> Self {
        Self { shift_m }
    }

    /// Authored coordinates, or `None` when location or heading is unknown.
    ///
    /// The altitude of the current location is kept.
    pub fn place(&self, current_location: Option<&GeoLocation>, heading: Option<Bearing>) -> Option<Coordinate> {
        let location = current_location?;
        let heading = heading?;

        Some(coordinates::shifted_along_bearing(
            &location.coordinate,
            heading,
            self.shift_m,
        ))
    }
}
