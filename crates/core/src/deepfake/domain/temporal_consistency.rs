use crate::shared::math::{clamp01, mean, mean_abs_diff, variance};
use crate::shared::signal::Signal;

const INCONSISTENCY_WEIGHT: f64 = 0.1;
const INCONSISTENCY_SIGNAL_THRESHOLD: f64 = 0.5;

/// How much per-frame probabilities jump around, in `[0, 1]`.
pub fn temporal_inconsistency(probabilities: &[f64]) -> f64 {
    if probabilities.len() < 2 {
        return 0.0;
    }
    (2.0 * (variance(probabilities) + mean_abs_diff(probabilities))).min(1.0)
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeepfakeSummary {
    pub mean: f64,
    pub variance: f64,
    pub inconsistency: f64,
    pub signals: Vec<Signal>,
}

/// Folds per-frame probabilities into the reported mean and variance.
///
/// Flicker between frames raises every probability slightly before
/// aggregation, so an unstable clip never scores as cleaner than a stable one.
pub fn summarize(probabilities: &[f64]) -> DeepfakeSummary {
    if probabilities.is_empty() {
        return DeepfakeSummary {
            mean: 0.5,
            ..Default::default()
        };
    }

    let inconsistency = temporal_inconsistency(probabilities);
    let adjusted: Vec<f64> = probabilities
        .iter()
        .map(|p| p + INCONSISTENCY_WEIGHT * inconsistency)
        .collect();

    let mut signals = Vec::new();
    if inconsistency > INCONSISTENCY_SIGNAL_THRESHOLD {
        signals.push(Signal::TemporalInconsistencyDetected);
    }

    DeepfakeSummary {
        mean: clamp01(mean(&adjusted)),
        variance: clamp01(variance(&adjusted)),
        inconsistency,
        signals,
    }
}
