//! Default pipeline parameters and empirically tuned calibration values.
//!
//! Every value here can be overridden through
//! [`Calibration`](crate::shared::config::Calibration) or
//! [`AnalysisConfig`](crate::shared::config::AnalysisConfig).

pub const DEFAULT_SAMPLE_INTERVAL: usize = 15;
pub const DEFAULT_MAX_FRAMES: usize = 12;

/// Minimum mean face-center displacement (px) between sampled frames.
pub const DEFAULT_MOTION_THRESHOLD: f64 = 2.0;

/// Leading decoded frames analysed at native rate for rPPG (~5s at 30 fps).
pub const DEFAULT_PULSE_WINDOW: usize = 150;

/// Used when the container does not report a frame rate.
pub const DEFAULT_FPS: f64 = 30.0;

pub const SCRATCH_SUFFIX_WEBM: &str = ".webm";
pub const SCRATCH_SUFFIX_MP4: &str = ".mp4";

/// EBML header that opens every WebM/Matroska file.
pub const EBML_MAGIC: [u8; 4] = [0x1a, 0x45, 0xdf, 0xa3];

// Quality

/// Laplacian variance divisor; webcam footage clusters around 0.5-1.0.
pub const BLUR_NORMALIZATION: f64 = 150.0;
pub const BRIGHTNESS_LOW: f64 = 50.0;
pub const BRIGHTNESS_HIGH: f64 = 200.0;
/// Intensity units above `BRIGHTNESS_HIGH` over which the score decays to 0.
pub const BRIGHTNESS_FALLOFF: f64 = 100.0;

// Deepfake heuristics

pub const EDGE_THRESHOLD: f64 = 35.0;
pub const EDGE_CEILING: f64 = 0.6;
pub const TEXTURE_SMOOTH_VARIANCE: f64 = 20.0;
pub const TEXTURE_SHARP_VARIANCE: f64 = 200.0;
pub const TEXTURE_MIN_SPREAD: f64 = 10.0;
pub const BATCH_VARIANCE_THRESHOLD: f64 = 0.05;
pub const BATCH_VARIANCE_PENALTY: f64 = 0.1;

/// Probability assigned to frames without a usable face crop.
pub const MISSING_ROI_PROBABILITY: f64 = 0.1;

/// Side length of the square tensor fed to deepfake models.
pub const ROI_TENSOR_SIZE: u32 = 224;
pub const ROI_TENSOR_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const ROI_TENSOR_STD: [f32; 3] = [0.229, 0.224, 0.225];

// Pulse

pub const PULSE_CONFIDENCE_FLOOR: f64 = 0.05;
pub const MICRO_MOTION_FLOOR: f64 = 0.02;
