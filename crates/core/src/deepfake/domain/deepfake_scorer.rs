use log::debug;

use crate::deepfake::domain::deepfake_model::DeepfakeModel;
use crate::deepfake::domain::heuristic_model::HeuristicDeepfakeModel;
use crate::deepfake::domain::roi_tensor::RoiTensor;
use crate::deepfake::domain::temporal_consistency::{summarize, DeepfakeSummary};
use crate::shared::constants::MISSING_ROI_PROBABILITY;
use crate::shared::signal::Signal;

/// Probability used when a trained model returns something that is not a number.
const NON_FINITE_PROBABILITY: f64 = 0.5;

/// The deepfake model in use, fixed when the pipeline is built.
pub enum DeepfakeScorer {
    Heuristic(HeuristicDeepfakeModel),
    Trained(Box<dyn DeepfakeModel>),
}

impl DeepfakeScorer {
    pub fn name(&self) -> &str {
        match self {
            DeepfakeScorer::Heuristic(model) => model.name(),
            DeepfakeScorer::Trained(model) => model.name(),
        }
    }

    /// Per-frame probabilities in `[0, 1]`, one per tensor.
    pub fn probabilities(&self, tensors: &[RoiTensor]) -> Vec<f64> {
        match self {
            DeepfakeScorer::Heuristic(model) => model.predict_batch(tensors),
            DeepfakeScorer::Trained(model) => trained_probabilities(model.as_ref(), tensors),
        }
    }

    /// Scores a batch and folds in temporal consistency.
    pub fn score(&self, tensors: &[RoiTensor]) -> DeepfakeSummary {
        let probabilities = self.probabilities(tensors);
        debug!("{} probabilities: {:?}", self.name(), probabilities);

        let mut summary = summarize(&probabilities);
        if matches!(self, DeepfakeScorer::Heuristic(_)) {
            summary.signals.push(Signal::UsingHeuristicModel);
        }
        summary
    }
}

/// Runs the model only on real crops; missing faces keep a fixed probability.
fn trained_probabilities(model: &dyn DeepfakeModel, tensors: &[RoiTensor]) -> Vec<f64> {
    let present: Vec<RoiTensor> = tensors.iter().filter(|t| !t.is_empty()).cloned().collect();
    let mut predictions = model.predict_batch(&present).into_iter();

    tensors
        .iter()
        .map(|tensor| {
            if tensor.is_empty() {
                return MISSING_ROI_PROBABILITY;
            }
            match predictions.next() {
                Some(p) if p.is_finite() => p.clamp(0.0, 1.0),
                _ => NON_FINITE_PROBABILITY,
            }
        })
        .collect()
}
