use serde::Serialize;

use crate::motion::optical_flow::OpticalFlowField;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;
use crate::shared::image_ops::plane_variance;
use crate::shared::math::{clamp01, mean, variance};
use crate::shared::signal::Signal;

const FOREHEAD: ((f64, f64), (f64, f64)) = ((0.1, 0.35), (0.25, 0.75));
const LEFT_CHEEK: ((f64, f64), (f64, f64)) = ((0.5, 0.75), (0.1, 0.35));
const RIGHT_CHEEK: ((f64, f64), (f64, f64)) = ((0.5, 0.75), (0.65, 0.9));

const VARIANCE_SCALE: f64 = 1000.0;
const JITTER_SCALE: f64 = 5.0;
const PERIODICITY_SCALE: f64 = 10.0;
const NEUTRAL_SMOOTHNESS: f64 = 0.5;
const EPSILON: f64 = 1e-6;

const LOW_MICRO_MOTION: f64 = 0.2;
const UNNATURAL_SMOOTHNESS: f64 = 0.4;
const PERIODIC_PATTERN: f64 = 0.7;

/// Raw human-sensing features behind the presage composite.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PresageFeatures {
    pub micro_motion: f64,
    pub smoothness: f64,
    pub periodicity_proxy: f64,
    pub face_presence_ratio: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PresageScore {
    pub score: f64,
    pub raw: PresageFeatures,
    pub signals: Vec<Signal>,
}

/// Texture energy of the forehead and both cheeks, each capped at 1.
pub fn micro_motion_energy(roi: &Frame) -> f64 {
    if roi.is_empty() {
        return 0.0;
    }
    let whole = BoundingBox::new(0, 0, roi.width() as i32, roi.height() as i32);
    let energies: Vec<f64> = [FOREHEAD, LEFT_CHEEK, RIGHT_CHEEK]
        .into_iter()
        .map(|(rows, cols)| whole.fraction(rows, cols))
        .filter(|region| region.area() > 0)
        .map(|region| {
            let gray = roi.crop(&region).luma();
            (plane_variance(&gray) / VARIANCE_SCALE).min(1.0)
        })
        .collect();
    mean(&energies)
}

/// Frame-to-frame consistency of consecutive flow fields; 0.5 with fewer
/// than two fields.
pub fn motion_smoothness(flows: &[OpticalFlowField]) -> f64 {
    if flows.len() < 2 {
        return NEUTRAL_SMOOTHNESS;
    }
    let scores: Vec<f64> = flows
        .windows(2)
        .filter(|pair| !pair[0].is_empty() && !pair[1].is_empty())
        .map(|pair| {
            let jitter = pair[0].mean_abs_difference(&pair[1]);
            (1.0 - jitter / JITTER_SCALE).max(0.0)
        })
        .collect();
    if scores.is_empty() {
        NEUTRAL_SMOOTHNESS
    } else {
        mean(&scores)
    }
}

/// Autocorrelation peak strength of the green-channel change series.
///
/// Screen replays tend to flicker with a regular period; natural footage
/// gives weak, irregular peaks. 0 with fewer than three frames or no peak.
pub fn periodicity_proxy(frames: &[Frame]) -> f64 {
    let greens: Vec<f64> = frames
        .iter()
        .filter(|f| !f.is_empty())
        .map(|f| f.channel_mean(1))
        .collect();
    if greens.len() < 3 {
        return 0.0;
    }

    let diffs: Vec<f64> = greens.windows(2).map(|w| w[1] - w[0]).collect();
    let autocorr = autocorrelation(&diffs);
    if autocorr.len() <= 2 {
        return 0.0;
    }

    let peaks: Vec<f64> = autocorr
        .windows(3)
        .filter(|w| w[1] > w[0] && w[1] > w[2])
        .map(|w| w[1])
        .collect();
    if peaks.is_empty() {
        return 0.0;
    }
    let strength = mean(&peaks) / (variance(&diffs) + EPSILON);
    clamp01(strength / PERIODICITY_SCALE)
}

/// Non-negative lags of the full autocorrelation, lag 0 first.
fn autocorrelation(series: &[f64]) -> Vec<f64> {
    let n = series.len();
    (0..n)
        .map(|lag| (0..n - lag).map(|i| series[i] * series[i + lag]).sum())
        .collect()
}

/// Presage composite over the sampled frames.
///
/// `rois` and `boxes` are aligned with `frames`; `flows[i]` runs from frame
/// `i` to `i + 1`.
pub fn compute_presage_features(
    frames: &[Frame],
    rois: &[Option<Frame>],
    boxes: &[Option<BoundingBox>],
    flows: &[OpticalFlowField],
) -> PresageScore {
    if frames.is_empty() {
        return PresageScore {
            score: 0.0,
            raw: PresageFeatures::default(),
            signals: Vec::new(),
        };
    }

    let face_presence_ratio =
        boxes.iter().filter(|b| b.is_some()).count() as f64 / frames.len() as f64;

    let energies: Vec<f64> = rois
        .iter()
        .flatten()
        .filter(|roi| !roi.is_empty())
        .map(micro_motion_energy)
        .collect();
    let micro_motion = mean(&energies);

    let smoothness = motion_smoothness(flows);
    let periodicity = periodicity_proxy(frames);

    let score = clamp01(
        0.35 * micro_motion
            + 0.35 * smoothness
            + 0.15 * (1.0 - periodicity)
            + 0.15 * face_presence_ratio,
    );

    let mut signals = Vec::new();
    if micro_motion < LOW_MICRO_MOTION {
        signals.push(Signal::LowMicroMotion);
    }
    if smoothness < UNNATURAL_SMOOTHNESS {
        signals.push(Signal::UnnaturalMotion);
    }
    if periodicity > PERIODIC_PATTERN {
        signals.push(Signal::PeriodicPatternDetected);
    }

    PresageScore {
        score,
        raw: PresageFeatures {
            micro_motion,
            smoothness,
            periodicity_proxy: periodicity,
            face_presence_ratio,
        },
        signals,
    }
}
