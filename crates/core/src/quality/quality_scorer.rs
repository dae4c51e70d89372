use crate::shared::config::Calibration;
use crate::shared::frame::Frame;
use crate::shared::image_ops::{laplacian_variance, plane_mean};
use crate::shared::math::{clamp01, mean};
use crate::shared::signal::Signal;

const BLUR_WEIGHT: f64 = 0.4;
const BRIGHTNESS_WEIGHT: f64 = 0.3;
const PRESENCE_WEIGHT: f64 = 0.3;

const LOW_FACE_PRESENCE: f64 = 0.5;
const BLURRY: f64 = 0.3;
const POOR_LIGHTING: f64 = 0.3;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QualityScore {
    pub score: f64,
    pub avg_blur: f64,
    pub avg_brightness: f64,
    pub face_presence_ratio: f64,
    pub signals: Vec<Signal>,
}

/// Sharpness in [0, 1]: Laplacian variance over the normalization divisor.
pub fn blur_score(roi: &Frame, calibration: &Calibration) -> f64 {
    if roi.is_empty() {
        return 0.0;
    }
    (laplacian_variance(&roi.luma()) / calibration.blur_normalization).min(1.0)
}

/// 1 inside the acceptable mean-intensity band, decaying linearly outside.
pub fn brightness_score(roi: &Frame, calibration: &Calibration) -> f64 {
    if roi.is_empty() {
        return 0.0;
    }
    let intensity = plane_mean(&roi.luma());
    let (low, high) = (calibration.brightness_low, calibration.brightness_high);
    if intensity < low {
        intensity / low
    } else if intensity > high {
        (1.0 - (intensity - high) / calibration.brightness_falloff).max(0.0)
    } else {
        1.0
    }
}

/// Blur, lighting and face-presence composite over the sampled ROIs.
///
/// A missing ROI counts as a frame with no face and scores 0 for both blur
/// and brightness.
pub fn compute_quality_score(rois: &[Option<Frame>], calibration: &Calibration) -> QualityScore {
    if rois.is_empty() {
        return QualityScore {
            signals: vec![Signal::NoRois],
            ..Default::default()
        };
    }

    let mut blur = Vec::with_capacity(rois.len());
    let mut brightness = Vec::with_capacity(rois.len());
    let mut faces = 0usize;
    for roi in rois {
        match roi.as_ref().filter(|r| !r.is_empty()) {
            Some(roi) => {
                blur.push(blur_score(roi, calibration));
                brightness.push(brightness_score(roi, calibration));
                faces += 1;
            }
            None => {
                blur.push(0.0);
                brightness.push(0.0);
            }
        }
    }

    let face_presence_ratio = faces as f64 / rois.len() as f64;
    let avg_blur = mean(&blur);
    let avg_brightness = mean(&brightness);

    let mut signals = Vec::new();
    if face_presence_ratio < LOW_FACE_PRESENCE {
        signals.push(Signal::LowFacePresence);
    }
    if avg_blur < BLURRY {
        signals.push(Signal::BlurryVideo);
    }
    if avg_brightness < POOR_LIGHTING {
        signals.push(Signal::PoorLighting);
    }

    QualityScore {
        score: clamp01(
            BLUR_WEIGHT * avg_blur
                + BRIGHTNESS_WEIGHT * avg_brightness
                + PRESENCE_WEIGHT * face_presence_ratio,
        ),
        avg_blur,
        avg_brightness,
        face_presence_ratio,
        signals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn flat(value: u8) -> Frame {
        Frame::new(vec![value; 16 * 16 * 3], 16, 16, 3, 0)
    }

    fn checkerboard() -> Frame {
        let data = (0..16 * 16)
            .flat_map(|i| {
                let v: u8 = if (i % 16 + i / 16) % 2 == 0 { 60 } else { 190 };
                [v, v, v]
            })
            .collect();
        Frame::new(data, 16, 16, 3, 0)
    }

    #[test]
    fn test_empty_input() {
        let result = compute_quality_score(&[], &Calibration::default());
        assert_relative_eq!(result.score, 0.0);
        assert_eq!(result.signals, vec![Signal::NoRois]);
    }

    #[rstest]
    #[case::dark(0, 0.0)]
    #[case::dim(25, 0.5)]
    #[case::band_low(50, 1.0)]
    #[case::band_mid(128, 1.0)]
    #[case::band_high(200, 1.0)]
    #[case::bright(250, 0.5)]
    fn test_brightness_curve(#[case] value: u8, #[case] expected: f64) {
        assert_relative_eq!(brightness_score(&flat(value), &Calibration::default()), expected);
    }

    #[test]
    fn test_flat_roi_is_blurry() {
        assert_relative_eq!(blur_score(&flat(128), &Calibration::default()), 0.0);
    }

    #[test]
    fn test_textured_roi_is_sharp() {
        assert_relative_eq!(blur_score(&checkerboard(), &Calibration::default()), 1.0);
    }

    #[test]
    fn test_all_missing_rois() {
        let result = compute_quality_score(&[None, None], &Calibration::default());
        assert_relative_eq!(result.score, 0.0);
        assert_eq!(
            result.signals,
            vec![Signal::LowFacePresence, Signal::BlurryVideo, Signal::PoorLighting]
        );
    }

    #[test]
    fn test_composite_weights() {
        let rois = vec![Some(checkerboard()), Some(flat(128)), None, Some(checkerboard())];
        let result = compute_quality_score(&rois, &Calibration::default());
        assert_relative_eq!(result.face_presence_ratio, 0.75);
        assert_relative_eq!(result.avg_blur, 0.5);
        assert_relative_eq!(result.avg_brightness, 0.75);
        assert_relative_eq!(result.score, 0.4 * 0.5 + 0.3 * 0.75 + 0.3 * 0.75, epsilon = 1e-12);
        assert!(result.signals.is_empty());
    }

    #[test]
    fn test_calibration_is_respected() {
        let strict = Calibration {
            brightness_low: 150.0,
            ..Default::default()
        };
        assert_relative_eq!(brightness_score(&flat(75), &strict), 0.5);
    }
}
