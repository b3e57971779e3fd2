//! Core data types shared by the estimate store, translator and node registry

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Position in the locally tracked scene frame (meters).
///
/// Axes follow a gravity-and-heading aligned session: +x east, +y up, -z north.
pub type ScenePosition = Vector3<f64>;

/// Compass bearing in degrees clockwise from true north
pub type Bearing = f64;

/// Geographic coordinate in WGS84 decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
    /// Altitude above sea level (meters)
    #[serde(default)]
    pub altitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }

    /// Check that the coordinate lies inside the WGS84 domain
    pub fn validate(&self) -> Result<(), LocationError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(LocationError::LatitudeOutOfRange(self.latitude));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(LocationError::LongitudeOutOfRange(self.longitude));
        }
        if !self.altitude.is_finite() {
            return Err(LocationError::NonFiniteAltitude);
        }
        Ok(())
    }
}

/// A geographic fix as delivered by the location provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub coordinate: Coordinate,
    /// Radius of horizontal uncertainty (meters, >= 0)
    pub horizontal_accuracy: f64,
    /// Fix time (milliseconds since epoch)
    pub timestamp_ms: u64,
}

impl GeoLocation {
    /// Build a validated location.
    pub fn new(
        coordinate: Coordinate,
        horizontal_accuracy: f64,
        timestamp_ms: u64,
    ) -> Result<Self, LocationError> {
        coordinate.validate()?;
        if !horizontal_accuracy.is_finite() || horizontal_accuracy < 0.0 {
            return Err(LocationError::InvalidAccuracy(horizontal_accuracy));
        }

        Ok(Self {
            coordinate,
            horizontal_accuracy,
            timestamp_ms,
        })
    }

    /// Same fix with its coordinate replaced
    pub fn with_coordinate(&self, coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            ..*self
        }
    }
}

/// Rejected location input
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationError {
    #[error("latitude {0} outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} outside [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("altitude is not finite")]
    NonFiniteAltitude,
    #[error("horizontal accuracy {0} must be finite and non-negative")]
    InvalidAccuracy(f64),
}

/// Geotagged content delivered by the remote feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Unique post identifier, also the registry key
    pub id: String,
    /// Where the post was authored
    pub coordinates: Coordinate,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub created_at_ms: u64,
    #[serde(default)]
    pub replies: Vec<Post>,
}

impl Post {
    pub fn new(id: impl Into<String>, coordinates: Coordinate) -> Self {
        Self {
            id: id.into(),
            coordinates,
            author: String::new(),
            content: String::new(),
            created_at_ms: 0,
            replies: Vec::new(),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }
}

/// Point on the rendering surface, in view pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
