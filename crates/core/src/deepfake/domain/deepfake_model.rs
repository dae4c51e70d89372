use crate::deepfake::domain::roi_tensor::RoiTensor;

/// Per-frame fake probability from a normalized face tensor.
///
/// Implementations return values in [0, 1]. The default batch call scores
/// frames one at a time; models with batch-level logic override it.
pub trait DeepfakeModel: Send + Sync {
    fn name(&self) -> &str;

    fn predict(&self, tensor: &RoiTensor) -> f64;

    fn predict_batch(&self, tensors: &[RoiTensor]) -> Vec<f64> {
        tensors.iter().map(|t| self.predict(t)).collect()
    }
}
