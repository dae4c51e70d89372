use ndarray::{s, Array2};

use crate::deepfake::domain::deepfake_model::DeepfakeModel;
use crate::deepfake::domain::roi_tensor::RoiTensor;
use crate::shared::config::Calibration;
use crate::shared::constants::MISSING_ROI_PROBABILITY;
use crate::shared::math::{clamp01, mean, std_dev, variance};

const EDGE_LOW_DIVISOR: f64 = 350.0;
const EDGE_HIGH_SPAN: f64 = 30.0;

const SKIN_RG: f64 = 1.15;
const SKIN_RG_TOLERANCE: f64 = 0.25;
const SKIN_GB: f64 = 1.05;
const SKIN_GB_TOLERANCE: f64 = 0.20;
const RATIO_EPSILON: f64 = 1e-6;

const PATCH_SIZE: usize = 8;
const MIN_TEXTURE_SIDE: usize = 16;
const TEXTURE_NORMAL: f64 = 0.05;
const TEXTURE_SMOOTH: f64 = 0.3;
const TEXTURE_SHARP: f64 = 0.25;
const TEXTURE_OTHER: f64 = 0.1;

/// Hand-tuned stand-in for a trained detector.
///
/// Three image statistics, each near 0 for ordinary webcam faces: boundary
/// sharpness, skin-tone colour ratios and patch texture. Batches whose
/// per-frame scores disagree strongly are pushed up as a whole.
#[derive(Clone, Debug)]
pub struct HeuristicDeepfakeModel {
    edge_threshold: f64,
    edge_ceiling: f64,
    smooth_variance: f64,
    sharp_variance: f64,
    min_spread: f64,
    batch_variance_threshold: f64,
    batch_variance_penalty: f64,
}

impl HeuristicDeepfakeModel {
    pub fn new(calibration: &Calibration) -> Self {
        Self {
            edge_threshold: calibration.edge_threshold,
            edge_ceiling: calibration.edge_ceiling,
            smooth_variance: calibration.texture_smooth_variance,
            sharp_variance: calibration.texture_sharp_variance,
            min_spread: calibration.texture_min_spread,
            batch_variance_threshold: calibration.batch_variance_threshold,
            batch_variance_penalty: calibration.batch_variance_penalty,
        }
    }

    /// Gradient energy mapped so ordinary faces stay under 0.1.
    fn edge_artifacts(&self, gray: &Array2<f64>) -> f64 {
        let (h, w) = gray.dim();
        if h < 2 || w < 2 {
            return 0.0;
        }
        let dx = (&gray.slice(s![.., 1..]) - &gray.slice(s![.., ..w - 1])).mapv(f64::abs);
        let dy = (&gray.slice(s![1.., ..]) - &gray.slice(s![..h - 1, ..])).mapv(f64::abs);
        let energy = dx.mean().unwrap_or(0.0) + dy.mean().unwrap_or(0.0);

        if energy < self.edge_threshold {
            energy / EDGE_LOW_DIVISOR
        } else {
            ((energy - self.edge_threshold) / EDGE_HIGH_SPAN * 0.5 + 0.1).min(self.edge_ceiling)
        }
    }

    /// Distance of the R/G and G/B ratios outside the natural skin band.
    fn color_abnormality(&self, channel_means: [f64; 3]) -> f64 {
        let [r, g, b] = channel_means;
        let rg = r / (g + RATIO_EPSILON);
        let gb = g / (b + RATIO_EPSILON);
        let rg_dev = ((rg - SKIN_RG).abs() - SKIN_RG_TOLERANCE).max(0.0);
        let gb_dev = ((gb - SKIN_GB).abs() - SKIN_GB_TOLERANCE).max(0.0);
        ((rg_dev + gb_dev) * 0.5).min(1.0)
    }

    /// Penalizes patch-variance distributions that are too flat or too harsh.
    fn texture_anomaly(&self, gray: &Array2<f64>) -> f64 {
        let (h, w) = gray.dim();
        if h < MIN_TEXTURE_SIDE || w < MIN_TEXTURE_SIDE {
            return TEXTURE_NORMAL;
        }

        let mut variances = Vec::new();
        for y in (0..h - PATCH_SIZE).step_by(PATCH_SIZE) {
            for x in (0..w - PATCH_SIZE).step_by(PATCH_SIZE) {
                let patch: Vec<f64> = gray
                    .slice(s![y..y + PATCH_SIZE, x..x + PATCH_SIZE])
                    .iter()
                    .copied()
                    .collect();
                variances.push(variance(&patch));
            }
        }
        if variances.is_empty() {
            return TEXTURE_NORMAL;
        }

        let mean_var = mean(&variances);
        let spread = std_dev(&variances);
        if mean_var > self.smooth_variance && mean_var < self.sharp_variance && spread > self.min_spread
        {
            TEXTURE_NORMAL
        } else if mean_var < self.smooth_variance {
            TEXTURE_SMOOTH
        } else if mean_var > self.sharp_variance {
            TEXTURE_SHARP
        } else {
            TEXTURE_OTHER
        }
    }
}

impl Default for HeuristicDeepfakeModel {
    fn default() -> Self {
        Self::new(&Calibration::default())
    }
}

impl DeepfakeModel for HeuristicDeepfakeModel {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn predict(&self, tensor: &RoiTensor) -> f64 {
        if tensor.is_empty() {
            return MISSING_ROI_PROBABILITY;
        }
        let rgb = tensor.to_rgb8();
        let (h, w, _) = rgb.dim();
        let gray = Array2::from_shape_fn((h, w), |(y, x)| {
            (rgb[[y, x, 0]] as f64 + rgb[[y, x, 1]] as f64 + rgb[[y, x, 2]] as f64) / 3.0
        });
        let channel_means = [0usize, 1, 2].map(|c| {
            rgb.slice(s![.., .., c])
                .iter()
                .map(|&v| v as f64)
                .sum::<f64>()
                / (h * w) as f64
        });

        let features = [
            self.edge_artifacts(&gray),
            self.color_abnormality(channel_means),
            self.texture_anomaly(&gray),
        ];
        clamp01(mean(&features))
    }

    fn predict_batch(&self, tensors: &[RoiTensor]) -> Vec<f64> {
        let probs: Vec<f64> = tensors.iter().map(|t| self.predict(t)).collect();
        if probs.len() >= 3 && variance(&probs) > self.batch_variance_threshold {
            return probs
                .into_iter()
                .map(|p| (p + self.batch_variance_penalty).min(1.0))
                .collect();
        }
        probs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::frame::Frame;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn model() -> HeuristicDeepfakeModel {
        HeuristicDeepfakeModel::default()
    }

    fn plane(f: impl Fn(usize, usize) -> f64) -> Array2<f64> {
        Array2::from_shape_fn((32, 32), |(y, x)| f(y, x))
    }

    fn solid_tensor(rgb: [u8; 3]) -> RoiTensor {
        RoiTensor::with_size(&Frame::new(rgb.repeat(32 * 32), 32, 32, 3, 0), 32)
    }

    #[test]
    fn test_empty_tensor_is_neutral() {
        assert_relative_eq!(model().predict(&RoiTensor::empty()), 0.1);
    }

    #[test]
    fn test_flat_plane_has_no_edges() {
        assert_relative_eq!(model().edge_artifacts(&plane(|_, _| 90.0)), 0.0);
    }

    #[test]
    fn test_mild_gradient_stays_low() {
        // 10 per column horizontally, 0 vertically
        let score = model().edge_artifacts(&plane(|_, x| x as f64 * 10.0));
        assert_relative_eq!(score, 10.0 / 350.0, epsilon = 1e-12);
    }

    #[test]
    fn test_harsh_edges_are_capped() {
        let checker = plane(|y, x| if (x + y) % 2 == 0 { 0.0 } else { 255.0 });
        assert_relative_eq!(model().edge_artifacts(&checker), 0.6);
    }

    #[rstest]
    #[case::skin([180.0, 150.0, 140.0], 0.0)]
    #[case::neutral_gray([128.0, 128.0, 128.0], 0.0)]
    #[case::green_cast([100.0, 200.0, 100.0], 0.5 * ((1.15 - 0.5) - 0.25 + (2.0 - 1.05) - 0.20))]
    fn test_color_abnormality(#[case] means: [f64; 3], #[case] expected: f64) {
        assert_relative_eq!(model().color_abnormality(means), expected, epsilon = 1e-6);
    }

    #[test]
    fn test_smooth_texture_is_suspicious() {
        assert_relative_eq!(model().texture_anomaly(&plane(|_, _| 100.0)), 0.3);
    }

    #[test]
    fn test_harsh_texture_is_suspicious() {
        let checker = plane(|y, x| if (x + y) % 2 == 0 { 0.0 } else { 255.0 });
        assert_relative_eq!(model().texture_anomaly(&checker), 0.25);
    }

    #[test]
    fn test_tiny_plane_texture_default() {
        let tiny = Array2::from_elem((8, 8), 10.0);
        assert_relative_eq!(model().texture_anomaly(&tiny), 0.05);
    }

    #[test]
    fn test_flat_gray_face_score() {
        // no edges, neutral colour, smooth texture
        assert_relative_eq!(model().predict(&solid_tensor([128, 128, 128])), 0.1, epsilon = 1e-9);
    }

    /// Red/black pixel checkerboard: harsh edges, no green or blue, noisy texture.
    fn red_checker_tensor() -> RoiTensor {
        let pixels: Vec<u8> = (0..32 * 32)
            .flat_map(|i| {
                if (i % 32 + i / 32) % 2 == 0 {
                    [255, 0, 0]
                } else {
                    [0, 0, 0]
                }
            })
            .collect();
        RoiTensor::with_size(&Frame::new(pixels, 32, 32, 3, 0), 32)
    }

    #[test]
    fn test_red_checker_scores_high() {
        // edges capped at 0.6, colour saturated at 1.0, harsh texture 0.25
        let score = model().predict(&red_checker_tensor());
        assert_relative_eq!(score, (0.6 + 1.0 + 0.25) / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_batch_penalty_on_disagreement() {
        let m = model();
        let calm = solid_tensor([128, 128, 128]);
        let wild = red_checker_tensor();
        let batch = [calm.clone(), wild.clone(), calm, wild];
        let singles: Vec<f64> = batch.iter().map(|t| m.predict(t)).collect();
        assert!(variance(&singles) > 0.06);

        let penalized = m.predict_batch(&batch);

        assert_eq!(penalized.len(), 4);
        for (p, s) in penalized.iter().zip(&singles) {
            assert_relative_eq!(*p, s + 0.1, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_batch_of_two_is_never_penalized() {
        let m = model();
        let t = solid_tensor([128, 128, 128]);
        assert_eq!(m.predict_batch(&[t.clone(), t.clone()]), vec![m.predict(&t); 2]);
    }
}
