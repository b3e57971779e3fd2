//! Simulated location provider for demos and soak tests.
//!
//! Produces noisy fixes for a device whose true position is known in the
//! scene frame, the way a phone GPS reports a walking user.

use crate::algorithms::coordinates;
use crate::algorithms::LocalTranslation;
use crate::core::{Bearing, Coordinate, GeoLocation, ScenePosition};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct SimulatedLocationProvider {
    /// Geographic position of the scene origin
    origin: Coordinate,
    rng: StdRng,
    /// Maximum horizontal error applied to each fix (meters)
    jitter_m: f64,
    /// Reported accuracy range (meters)
    accuracy_range: (f64, f64),
    /// Maximum compass error (degrees)
    heading_jitter_deg: f64,
    clock_ms: u64,
    fix_interval_ms: u64,
}

impl SimulatedLocationProvider {
    pub fn new(origin: Coordinate, seed: u64) -> Self {
        Self {
            origin,
            rng: StdRng::seed_from_u64(seed),
            jitter_m: 2.0,
            accuracy_range: (3.0, 12.0),
            heading_jitter_deg: 3.0,
            clock_ms: 0,
            fix_interval_ms: 1000,
        }
    }

    pub fn with_noise(mut self, jitter_m: f64, accuracy_range: (f64, f64)) -> Self {
        self.jitter_m = jitter_m.max(0.0);
        self.accuracy_range = (accuracy_range.0.max(0.0), accuracy_range.1.max(accuracy_range.0.max(0.0)));
        self
    }

    pub fn with_start_time(mut self, start_ms: u64) -> Self {
        self.clock_ms = start_ms;
        self
    }

    /// Next fix for a device at `true_position` in the scene frame
    pub fn fix_at(&mut self, true_position: &ScenePosition) -> GeoLocation {
        let mut translation = LocalTranslation::from_scene_offset(true_position);
        if self.jitter_m > 0.0 {
            translation.east_m += self.rng.gen_range(-self.jitter_m..=self.jitter_m);
            translation.north_m += self.rng.gen_range(-self.jitter_m..=self.jitter_m);
        }

        let (min_accuracy, max_accuracy) = self.accuracy_range;
        let horizontal_accuracy = if max_accuracy > min_accuracy {
            self.rng.gen_range(min_accuracy..=max_accuracy)
        } else {
            min_accuracy
        };

        self.clock_ms += self.fix_interval_ms;

        GeoLocation {
            coordinate: coordinates::translate(&self.origin, &translation),
            horizontal_accuracy,
            timestamp_ms: self.clock_ms,
        }
    }

    /// Noisy compass reading around `true_heading`, normalised to [0, 360)
    pub fn heading(&mut self, true_heading: Bearing) -> Bearing {
        let noise = if self.heading_jitter_deg > 0.0 {
            self.rng.gen_range(-self.heading_jitter_deg..=self.heading_jitter_deg)
        } else {
            0.0
        };
        (true_heading + noise).rem_euclid(360.0)
    }
}
