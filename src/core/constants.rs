//! Default tuning parameters for the scene location engine

/// Radius around the camera inside which estimates are trusted (meters)
pub const DEFAULT_SCENE_LIMIT_M: f64 = 5.0;

/// Reconciliation loop period (milliseconds)
pub const DEFAULT_RECONCILE_PERIOD_MS: u64 = 250;

/// Duration of the animated transition applied on each reconciliation (milliseconds)
pub const DEFAULT_ANIMATION_DURATION_MS: u64 = 300;

/// Distance newly authored content is pushed along the heading (meters)
pub const DEFAULT_ANCHOR_SHIFT_M: f64 = 1.0;

/// Nodes farther than this are pulled in and scaled down (meters)
pub const DEFAULT_FAR_PLACEMENT_DISTANCE_M: f64 = 100.0;
