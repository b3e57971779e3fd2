use crate::algorithms::{AnchorPlacementRule, PlacementPolicy};
use crate::core::{
    DEFAULT_ANCHOR_SHIFT_M, DEFAULT_ANIMATION_DURATION_MS, DEFAULT_FAR_PLACEMENT_DISTANCE_M,
    DEFAULT_RECONCILE_PERIOD_MS, DEFAULT_SCENE_LIMIT_M,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Engine tuning parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Radius around the camera inside which estimates are kept (meters)
    pub scene_limit_m: f64,
    /// Reconciliation loop period (milliseconds)
    pub reconcile_period_ms: u64,
    /// Animated transition length for reconciled nodes (milliseconds)
    pub animation_duration_ms: u64,
    /// How far in front of the camera authored content appears (meters)
    pub anchor_shift_m: f64,
    /// Nodes beyond this distance are pulled in and scaled down (meters)
    pub far_placement_distance_m: f64,
    /// Shrink near nodes in proportion to their distance
    pub scale_relative_to_distance: bool,
    /// Whether taps resolve to post nodes
    pub selection_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scene_limit_m: DEFAULT_SCENE_LIMIT_M,
            reconcile_period_ms: DEFAULT_RECONCILE_PERIOD_MS,
            animation_duration_ms: DEFAULT_ANIMATION_DURATION_MS,
            anchor_shift_m: DEFAULT_ANCHOR_SHIFT_M,
            far_placement_distance_m: DEFAULT_FAR_PLACEMENT_DISTANCE_M,
            scale_relative_to_distance: false,
            selection_enabled: true,
        }
    }
}

impl EngineConfig {
    pub fn reconcile_period(&self) -> Duration {
        Duration::from_millis(self.reconcile_period_ms)
    }

    pub fn animation_duration(&self) -> Duration {
        Duration::from_millis(self.animation_duration_ms)
    }

    pub fn placement_policy(&self) -> PlacementPolicy {
        PlacementPolicy {
            far_placement_distance_m: self.far_placement_distance_m,
            scale_relative_to_distance: self.scale_relative_to_distance,
        }
    }

    pub fn anchor_rule(&self) -> AnchorPlacementRule {
        AnchorPlacementRule::new(self.anchor_shift_m)
    }

    /// Reject the first out-of-range parameter
    pub fn validate(&self) -> Result<(), ConfigError> {
        let result = ConfigurationManager::validate_config(self);
        match result.errors.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid parameter '{parameter}' = '{value}': {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("no file path set for saving configuration")]
    NoFilePath,
}

impl ConfigError {
    fn invalid(parameter: &str, value: impl ToString, reason: &str) -> Self {
        ConfigError::InvalidParameter {
            parameter: parameter.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Outcome of validating a configuration
#[derive(Debug)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ConfigError>,
    pub warnings: Vec<String>,
}

/// Holds the active configuration and its backing file
#[derive(Debug, Default)]
pub struct ConfigurationManager {
    config: EngineConfig,
    config_file_path: Option<PathBuf>,
    is_modified: bool,
}

impl ConfigurationManager {
    /// Create a manager with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager and load from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut manager = Self::new();
        manager.load_from_file(path)?;
        Ok(manager)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replace the configuration after validation
    pub fn update_config(&mut self, config: EngineConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        self.is_modified = true;
        Ok(())
    }

    /// Load configuration from a JSON file. Missing fields take defaults.
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: EngineConfig = serde_json::from_str(&content)?;
        let validation = Self::validate_config(&config);
        for warning in &validation.warnings {
            warn!(path = %path.display(), "{}", warning);
        }
        if let Some(error) = validation.errors.into_iter().next() {
            return Err(error);
        }

        info!(path = %path.display(), "loaded engine configuration");
        self.config = config;
        self.config_file_path = Some(path.to_path_buf());
        self.is_modified = false;
        Ok(())
    }

    /// Save configuration as pretty-printed JSON
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(&self.config)?;

        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        self.config_file_path = Some(path.to_path_buf());
        self.is_modified = false;
        Ok(())
    }

    /// Save to the file the configuration was loaded from
    pub fn save(&mut self) -> Result<(), ConfigError> {
        match self.config_file_path.clone() {
            Some(path) => self.save_to_file(path),
            None => Err(ConfigError::NoFilePath),
        }
    }

    /// Check if configuration has been modified since last load or save
    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    // Runtime parameter adjustment. Each setter returns the previous value.

    pub fn set_scene_limit(&mut self, scene_limit_m: f64) -> Result<f64, ConfigError> {
        Self::check_scene_limit(scene_limit_m)?;
        let old = std::mem::replace(&mut self.config.scene_limit_m, scene_limit_m);
        self.is_modified = true;
        Ok(old)
    }

    pub fn set_reconcile_period(&mut self, period_ms: u64) -> Result<u64, ConfigError> {
        Self::check_reconcile_period(period_ms)?;
        let old = std::mem::replace(&mut self.config.reconcile_period_ms, period_ms);
        self.is_modified = true;
        Ok(old)
    }

    pub fn set_animation_duration(&mut self, duration_ms: u64) -> Result<u64, ConfigError> {
        Self::check_animation_duration(duration_ms)?;
        let old = std::mem::replace(&mut self.config.animation_duration_ms, duration_ms);
        self.is_modified = true;
        Ok(old)
    }

    pub fn set_anchor_shift(&mut self, shift_m: f64) -> Result<f64, ConfigError> {
        Self::check_anchor_shift(shift_m)?;
        let old = std::mem::replace(&mut self.config.anchor_shift_m, shift_m);
        self.is_modified = true;
        Ok(old)
    }

    pub fn set_far_placement_distance(&mut self, distance_m: f64) -> Result<f64, ConfigError> {
        Self::check_far_placement_distance(distance_m)?;
        let old = std::mem::replace(&mut self.config.far_placement_distance_m, distance_m);
        self.is_modified = true;
        Ok(old)
    }

    pub fn set_scale_relative_to_distance(&mut self, enabled: bool) -> bool {
        self.is_modified = true;
        std::mem::replace(&mut self.config.scale_relative_to_distance, enabled)
    }

    pub fn set_selection_enabled(&mut self, enabled: bool) -> bool {
        self.is_modified = true;
        std::mem::replace(&mut self.config.selection_enabled, enabled)
    }

    /// Validate every parameter, collecting all errors and warnings
    pub fn validate_config(config: &EngineConfig) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let checks = [
            Self::check_scene_limit(config.scene_limit_m),
            Self::check_reconcile_period(config.reconcile_period_ms),
            Self::check_animation_duration(config.animation_duration_ms),
            Self::check_anchor_shift(config.anchor_shift_m),
            Self::check_far_placement_distance(config.far_placement_distance_m),
        ];
        errors.extend(checks.into_iter().filter_map(Result::err));

        if config.animation_duration_ms > 4 * config.reconcile_period_ms {
            warnings.push(format!(
                "animation duration {}ms spans several reconcile periods ({}ms); most transitions will be superseded",
                config.animation_duration_ms, config.reconcile_period_ms
            ));
        }
        if config.scene_limit_m > 50.0 {
            warnings.push(format!(
                "scene limit {}m keeps estimates far beyond typical tracking drift",
                config.scene_limit_m
            ));
        }
        if config.far_placement_distance_m < config.anchor_shift_m {
            warnings.push("far placement distance is shorter than the anchor shift".to_string());
        }

        ValidationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    fn check_scene_limit(value: f64) -> Result<(), ConfigError> {
        if !value.is_finite() || value <= 0.0 || value > 1000.0 {
            return Err(ConfigError::invalid("scene_limit_m", value, "must be in (0, 1000] meters"));
        }
        Ok(())
    }

    fn check_reconcile_period(value: u64) -> Result<(), ConfigError> {
        if !(10..=10_000).contains(&value) {
            return Err(ConfigError::invalid(
                "reconcile_period_ms",
                value,
                "must be between 10 and 10000 ms",
            ));
        }
        Ok(())
    }

    fn check_animation_duration(value: u64) -> Result<(), ConfigError> {
        if value > 10_000 {
            return Err(ConfigError::invalid(
                "animation_duration_ms",
                value,
                "must not exceed 10000 ms",
            ));
        }
        Ok(())
    }

    fn check_anchor_shift(value: f64) -> Result<(), ConfigError> {
        if !value.is_finite() || !(0.0..=100.0).contains(&value) {
            return Err(ConfigError::invalid("anchor_shift_m", value, "must be in [0, 100] meters"));
        }
        Ok(())
    }

    fn check_far_placement_distance(value: f64) -> Result<(), ConfigError> {
        if !value.is_finite() || value <= 0.0 || value > 100_000.0 {
            return Err(ConfigError::invalid(
                "far_placement_distance_m",
                value,
                "must be in (0, 100000] meters",
            ));
        }
        Ok(())
    }
}
