use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::shared::constants::*;
use crate::shared::error::ConfigError;

/// Empirically tuned thresholds. Defaults are the values observed on webcam
/// footage, not a claimed optimum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    pub blur_normalization: f64,
    pub brightness_low: f64,
    pub brightness_high: f64,
    pub brightness_falloff: f64,
    pub edge_threshold: f64,
    pub edge_ceiling: f64,
    pub texture_smooth_variance: f64,
    pub texture_sharp_variance: f64,
    pub texture_min_spread: f64,
    pub batch_variance_threshold: f64,
    pub batch_variance_penalty: f64,
    pub pulse_confidence_floor: f64,
    pub micro_motion_floor: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            blur_normalization: BLUR_NORMALIZATION,
            brightness_low: BRIGHTNESS_LOW,
            brightness_high: BRIGHTNESS_HIGH,
            brightness_falloff: BRIGHTNESS_FALLOFF,
            edge_threshold: EDGE_THRESHOLD,
            edge_ceiling: EDGE_CEILING,
            texture_smooth_variance: TEXTURE_SMOOTH_VARIANCE,
            texture_sharp_variance: TEXTURE_SHARP_VARIANCE,
            texture_min_spread: TEXTURE_MIN_SPREAD,
            batch_variance_threshold: BATCH_VARIANCE_THRESHOLD,
            batch_variance_penalty: BATCH_VARIANCE_PENALTY,
            pulse_confidence_floor: PULSE_CONFIDENCE_FLOOR,
            micro_motion_floor: MICRO_MOTION_FLOOR,
        }
    }
}

impl Calibration {
    /// Rejects values the scorers divide by or compare against each other.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("calibration.blur_normalization", self.blur_normalization),
            ("calibration.brightness_low", self.brightness_low),
            ("calibration.brightness_falloff", self.brightness_falloff),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(field, "a positive number", value));
            }
        }
        if !(self.brightness_high.is_finite() && self.brightness_high >= self.brightness_low) {
            return Err(invalid(
                "calibration.brightness_high",
                ">= calibration.brightness_low",
                self.brightness_high,
            ));
        }
        Ok(())
    }
}

/// Per-call analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub sample_interval: usize,
    pub max_frames: usize,
    pub motion_threshold: f64,
    pub pulse_window: usize,
    pub default_fps: f64,
    /// Worker threads for per-frame stages; 0 uses available parallelism.
    pub worker_threads: usize,
    pub calibration: Calibration,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            max_frames: DEFAULT_MAX_FRAMES,
            motion_threshold: DEFAULT_MOTION_THRESHOLD,
            pulse_window: DEFAULT_PULSE_WINDOW,
            default_fps: DEFAULT_FPS,
            worker_threads: 0,
            calibration: Calibration::default(),
        }
    }
}

impl AnalysisConfig {
    /// Reads a JSON config file; missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_interval == 0 {
            return Err(invalid("sample_interval", ">= 1", self.sample_interval));
        }
        if self.max_frames == 0 {
            return Err(invalid("max_frames", ">= 1", self.max_frames));
        }
        if self.pulse_window == 0 {
            return Err(invalid("pulse_window", ">= 1", self.pulse_window));
        }
        if !(self.default_fps.is_finite() && self.default_fps > 0.0) {
            return Err(invalid("default_fps", "a positive number", self.default_fps));
        }
        if !(self.motion_threshold.is_finite() && self.motion_threshold >= 0.0) {
            return Err(invalid(
                "motion_threshold",
                "a non-negative number",
                self.motion_threshold,
            ));
        }
        self.calibration.validate()
    }
}

fn invalid(field: &'static str, requirement: &'static str, value: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        field,
        requirement,
        value: value.to_string(),
    }
}
