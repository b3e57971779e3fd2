//! Local tangent plane transformations between geographic coordinates and
//! short-range east/north/up offsets.
//!
//! All conversions use the WGS84 radii of curvature evaluated at the reference
//! coordinate. This is a flat-earth approximation: accurate over the few
//! meters to few hundred meters a tracking session spans, not for long
//! baselines.

use crate::core::{Bearing, Coordinate, ScenePosition};
use nalgebra::Vector3;

/// Earth radius in meters (WGS84)
pub const EARTH_RADIUS_WGS84: f64 = 6378137.0;

/// Earth flattening factor (WGS84)
pub const EARTH_FLATTENING_WGS84: f64 = 1.0 / 298.257223563;

/// Eccentricity squared (WGS84)
pub const ECCENTRICITY_SQUARED_WGS84: f64 =
    2.0 * EARTH_FLATTENING_WGS84 - EARTH_FLATTENING_WGS84 * EARTH_FLATTENING_WGS84;

/// Offset in the local tangent plane (meters)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LocalTranslation {
    pub east_m: f64,
    pub north_m: f64,
    pub up_m: f64,
}

impl LocalTranslation {
    pub fn new(east_m: f64, north_m: f64, up_m: f64) -> Self {
        Self { east_m, north_m, up_m }
    }

    /// Interpret a scene-space vector (+x east, +y up, -z north)
    pub fn from_scene_offset(offset: &ScenePosition) -> Self {
        Self {
            east_m: offset.x,
            north_m: -offset.z,
            up_m: offset.y,
        }
    }

    /// Express this translation as a scene-space vector
    pub fn to_scene_offset(&self) -> ScenePosition {
        Vector3::new(self.east_m, self.up_m, -self.north_m)
    }

    pub fn horizontal_distance(&self) -> f64 {
        self.east_m.hypot(self.north_m)
    }
}

/// Meridional (north-south) and prime vertical (east-west) radii at a latitude
fn radii_of_curvature(latitude_deg: f64) -> (f64, f64) {
    let sin_lat = latitude_deg.to_radians().sin();
    let denominator = 1.0 - ECCENTRICITY_SQUARED_WGS84 * sin_lat * sin_lat;

    let prime_vertical = EARTH_RADIUS_WGS84 / denominator.sqrt();
    let meridional = EARTH_RADIUS_WGS84 * (1.0 - ECCENTRICITY_SQUARED_WGS84) / denominator.powf(1.5);

    (meridional, prime_vertical)
}

/// Bring a longitude (or longitude difference) into (-180, 180].
///
/// Values already in range are returned untouched.
fn wrap_longitude(degrees: f64) -> f64 {
    if degrees > -180.0 && degrees <= 180.0 {
        return degrees;
    }
    let wrapped = (degrees + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped <= -180.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

/// Apply a local offset to a coordinate
pub fn translate(origin: &Coordinate, translation: &LocalTranslation) -> Coordinate {
    let (m, n) = radii_of_curvature(origin.latitude);
    let cos_lat = origin.latitude.to_radians().cos();

    let lat_diff = translation.north_m / m;
    // Longitude is degenerate at the poles; keep it fixed there.
    let lon_diff = if cos_lat.abs() > f64::EPSILON {
        translation.east_m / (n * cos_lat)
    } else {
        0.0
    };

    Coordinate {
        latitude: origin.latitude + lat_diff.to_degrees(),
        longitude: wrap_longitude(origin.longitude + lon_diff.to_degrees()),
        altitude: origin.altitude + translation.up_m,
    }
}

/// Local offset that moves `from` onto `to`
pub fn translation_between(from: &Coordinate, to: &Coordinate) -> LocalTranslation {
    let (m, n) = radii_of_curvature(from.latitude);
    let cos_lat = from.latitude.to_radians().cos();

    let lat_diff = (to.latitude - from.latitude).to_radians();
    // The short way round across the antimeridian
    let lon_diff = wrap_longitude(to.longitude - from.longitude).to_radians();

    LocalTranslation {
        east_m: n * cos_lat * lon_diff,
        north_m: m * lat_diff,
        up_m: to.altitude - from.altitude,
    }
}

/// Coordinate reached by moving `distance_m` along `bearing` on the horizontal plane
pub fn shifted_along_bearing(origin: &Coordinate, bearing: Bearing, distance_m: f64) -> Coordinate {
    let bearing_rad = bearing.to_radians();
    let translation = LocalTranslation {
        east_m: distance_m * bearing_rad.sin(),
        north_m: distance_m * bearing_rad.cos(),
        up_m: 0.0,
    };

    translate(origin, &translation)
}

/// Horizontal (x/z plane) distance between two scene positions
pub fn horizontal_scene_distance(a: &ScenePosition, b: &ScenePosition) -> f64 {
    (a.x - b.x).hypot(a.z - b.z)
}
