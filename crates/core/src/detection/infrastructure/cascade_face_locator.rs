use ndarray::Array2;

use crate::detection::domain::face_locator::FaceLocator;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;
use crate::shared::image_ops::{equalize_histogram, resize_area};
use crate::shared::integral_image::IntegralImage;

/// Longest side of the plane the sliding window runs over.
const DETECTION_SIZE: usize = 160;
const MIN_WINDOW: usize = 24;
const SCALE_FACTOR: f64 = 1.1;
/// Windows flatter than this (equalized intensity units) are skipped.
const MIN_WINDOW_STD: f64 = 12.0;
/// Overlapping positive windows required to accept a detection.
const MIN_NEIGHBORS: usize = 2;
const NEIGHBOR_IOU: f64 = 0.3;

type Band = ((f64, f64), (f64, f64));

const FOREHEAD: Band = ((0.05, 0.25), (0.1, 0.9));
const EYE_BAND: Band = ((0.25, 0.45), (0.1, 0.9));
const LEFT_EYE: Band = ((0.25, 0.45), (0.15, 0.4));
const RIGHT_EYE: Band = ((0.25, 0.45), (0.6, 0.85));
const NOSE_BRIDGE: Band = ((0.25, 0.45), (0.4, 0.6));
const CHEEKS: Band = ((0.5, 0.7), (0.1, 0.9));
const MOUTH: Band = ((0.7, 0.85), (0.3, 0.7));

/// Rejection stages, cheapest first: minimum normalized contrast per
/// rectangle feature.
const EYE_STAGE: f64 = 0.2;
const FOREHEAD_STAGE: f64 = 0.2;
const BRIDGE_STAGE: f64 = 0.05;
const MOUTH_STAGE: f64 = 0.0;
const MAX_EYE_ASYMMETRY: f64 = 0.6;

/// Classical frontal-face locator built from Haar-like rectangle contrasts.
///
/// The frame is reduced to an equalized grayscale plane and scanned with
/// square windows at several scales. Each window passes through a short
/// cascade of contrast tests (dark eye band, bright forehead, bright nose
/// bridge between darker sockets, dark mouth, symmetric eyes) evaluated on an
/// integral image. Positive windows that are confirmed by overlapping
/// neighbours compete on their summed contrast; the best one is returned.
pub struct CascadeFaceLocator {
    detection_size: usize,
    min_window: usize,
}

impl CascadeFaceLocator {
    pub fn new() -> Self {
        Self {
            detection_size: DETECTION_SIZE,
            min_window: MIN_WINDOW,
        }
    }

    fn prepare(&self, frame: &Frame) -> (Array2<f32>, f64) {
        let luma = frame.luma();
        let (h, w) = luma.dim();
        let longest = h.max(w);
        if longest <= self.detection_size {
            return (equalize_histogram(&luma), 1.0);
        }
        let scale = self.detection_size as f64 / longest as f64;
        let new_h = ((h as f64 * scale).round() as usize).max(1);
        let new_w = ((w as f64 * scale).round() as usize).max(1);
        (equalize_histogram(&resize_area(&luma, new_h, new_w)), scale)
    }

    fn scan(&self, ii: &IntegralImage, h: usize, w: usize) -> Vec<(BoundingBox, f64)> {
        let mut candidates = Vec::new();
        let mut size = self.min_window as f64;
        while (size as usize) <= h.min(w) {
            let s = size as usize;
            let step = (s / 10).max(2);
            for y in (0..=h - s).step_by(step) {
                for x in (0..=w - s).step_by(step) {
                    if let Some(score) = evaluate_window(ii, x, y, s) {
                        candidates.push((
                            BoundingBox::new(x as i32, y as i32, s as i32, s as i32),
                            score,
                        ));
                    }
                }
            }
            size *= SCALE_FACTOR;
        }
        candidates
    }
}

impl Default for CascadeFaceLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl FaceLocator for CascadeFaceLocator {
    fn locate(&self, frame: &Frame) -> Option<BoundingBox> {
        if frame.is_empty() {
            return None;
        }
        let (plane, scale) = self.prepare(frame);
        let (h, w) = plane.dim();
        let ii = IntegralImage::with_squares(&plane);

        let mut candidates = self.scan(&ii, h, w);
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

        let best = candidates.iter().find(|(bbox, _)| {
            candidates
                .iter()
                .filter(|(other, _)| other != bbox && bbox.iou(other) > NEIGHBOR_IOU)
                .count()
                >= MIN_NEIGHBORS
        })?;

        let bbox = if scale < 1.0 {
            best.0.scaled(1.0 / scale)
        } else {
            best.0
        };
        bbox.clamp_to(frame.width(), frame.height())
    }
}

fn band_mean(ii: &IntegralImage, x: usize, y: usize, size: usize, band: Band) -> f64 {
    let ((r0, r1), (c0, c1)) = band;
    let s = size as f64;
    let y0 = (s * r0) as usize;
    let x0 = (s * c0) as usize;
    let bh = ((s * r1) as usize).saturating_sub(y0).max(1);
    let bw = ((s * c1) as usize).saturating_sub(x0).max(1);
    ii.mean(x + x0, y + y0, bw, bh)
}

/// Summed normalized contrast of a window, or `None` once any stage rejects.
fn evaluate_window(ii: &IntegralImage, x: usize, y: usize, size: usize) -> Option<f64> {
    let sigma = ii.std_dev(x, y, size, size);
    if sigma < MIN_WINDOW_STD {
        return None;
    }
    let mean = |band| band_mean(ii, x, y, size, band);

    let eyes = mean(EYE_BAND);
    let cheeks = mean(CHEEKS);
    let eye_contrast = (cheeks - eyes) / sigma;
    if eye_contrast < EYE_STAGE {
        return None;
    }

    let forehead_contrast = (mean(FOREHEAD) - eyes) / sigma;
    if forehead_contrast < FOREHEAD_STAGE {
        return None;
    }

    let left = mean(LEFT_EYE);
    let right = mean(RIGHT_EYE);
    let bridge_contrast = (mean(NOSE_BRIDGE) - (left + right) / 2.0) / sigma;
    if bridge_contrast < BRIDGE_STAGE {
        return None;
    }

    let mouth_contrast = (cheeks - mean(MOUTH)) / sigma;
    if mouth_contrast < MOUTH_STAGE {
        return None;
    }

    let asymmetry = (left - right).abs() / sigma;
    if asymmetry > MAX_EYE_ASYMMETRY {
        return None;
    }

    Some(eye_contrast + forehead_contrast + bridge_contrast + mouth_contrast - asymmetry)
}
