use crate::motion::optical_flow::OpticalFlowField;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::math::{clamp01, mean};
use crate::shared::signal::Signal;

/// Pixels of mean face-centre travel that count as full motion compliance.
const DISPLACEMENT_SCALE: f64 = 20.0;
const NEUTRAL_SCORE: f64 = 0.5;
const RIGID_RATIO: f64 = 0.3;
const FLOW_EPSILON: f64 = 1e-6;

#[derive(Clone, Debug, PartialEq)]
pub struct LivenessScore {
    pub score: f64,
    pub motion_compliance: f64,
    pub non_rigid_ratio: f64,
    pub signals: Vec<Signal>,
}

/// Share of local deformation (divergence and curl) in the total motion of
/// a flow field, halved and capped at 1. Rigid translation scores near 0.
pub fn non_rigid_ratio(flow: &OpticalFlowField) -> f64 {
    if flow.is_empty() {
        return 0.0;
    }
    let energy = mean_abs(&flow.divergence()) + mean_abs(&flow.curl());
    let (gx, gy) = flow.mean_abs();
    let ratio = energy / (gx + gy + FLOW_EPSILON);
    (ratio / 2.0).min(1.0)
}

fn mean_abs(plane: &ndarray::Array2<f32>) -> f64 {
    if plane.is_empty() {
        return 0.0;
    }
    plane.iter().map(|v| v.abs() as f64).sum::<f64>() / plane.len() as f64
}

/// Combines face-centre travel with the non-rigid share of dense flow.
///
/// `flows[i]` is the flow from sampled frame `i` to `i + 1`; a pair only
/// counts when the later frame has a face box.
pub fn score_liveness(
    boxes: &[Option<BoundingBox>],
    flows: &[OpticalFlowField],
    motion_threshold: f64,
) -> LivenessScore {
    if boxes.len() < 2 {
        return LivenessScore {
            score: NEUTRAL_SCORE,
            motion_compliance: 0.0,
            non_rigid_ratio: NEUTRAL_SCORE,
            signals: vec![Signal::InsufficientFramesForLiveness],
        };
    }

    let mut signals = Vec::new();

    let centers: Vec<(i32, i32)> = boxes.iter().flatten().map(|b| b.center()).collect();
    let displacement = if centers.len() >= 2 {
        let steps: Vec<f64> = centers
            .windows(2)
            .map(|pair| {
                let dx = (pair[1].0 - pair[0].0) as f64;
                let dy = (pair[1].1 - pair[0].1) as f64;
                (dx * dx + dy * dy).sqrt()
            })
            .collect();
        let avg = mean(&steps);
        if avg < motion_threshold {
            signals.push(Signal::LowMotion);
        }
        avg
    } else {
        0.0
    };

    let ratios: Vec<f64> = flows
        .iter()
        .enumerate()
        .filter(|(i, flow)| boxes.get(i + 1).is_some_and(|b| b.is_some()) && !flow.is_empty())
        .map(|(_, flow)| non_rigid_ratio(flow))
        .collect();
    let avg_ratio = if ratios.is_empty() {
        NEUTRAL_SCORE
    } else {
        mean(&ratios)
    };
    if avg_ratio < RIGID_RATIO {
        signals.push(Signal::RigidMotionSuspected);
    }

    let motion_compliance = (displacement / DISPLACEMENT_SCALE).min(1.0);
    LivenessScore {
        score: clamp01(0.4 * motion_compliance + 0.6 * avg_ratio),
        motion_compliance,
        non_rigid_ratio: avg_ratio,
        signals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    fn translation(h: usize, w: usize, dx: f32) -> OpticalFlowField {
        OpticalFlowField::new(Array2::from_elem((h, w), dx), Array2::zeros((h, w)))
    }

    fn expansion(h: usize, w: usize) -> OpticalFlowField {
        let cy = h as f32 / 2.0;
        let cx = w as f32 / 2.0;
        OpticalFlowField::new(
            Array2::from_shape_fn((h, w), |(_, x)| (x as f32 - cx) * 0.2),
            Array2::from_shape_fn((h, w), |(y, _)| (y as f32 - cy) * 0.2),
        )
    }

    fn face(x: i32) -> Option<BoundingBox> {
        Some(BoundingBox::new(x, 10, 40, 40))
    }

    #[test]
    fn test_single_frame_is_neutral() {
        let result = score_liveness(&[face(0)], &[], 2.0);
        assert_relative_eq!(result.score, 0.5);
        assert_eq!(result.signals, vec![Signal::InsufficientFramesForLiveness]);
    }

    #[test]
    fn test_static_face_zero_flow_scores_zero() {
        let boxes = vec![face(10); 4];
        let flows = vec![OpticalFlowField::zeros(8, 8); 3];
        let result = score_liveness(&boxes, &flows, 2.0);
        assert_relative_eq!(result.score, 0.0);
        assert!(result.signals.contains(&Signal::LowMotion));
        assert!(result.signals.contains(&Signal::RigidMotionSuspected));
    }

    #[test]
    fn test_rigid_translation_is_flagged() {
        assert!(non_rigid_ratio(&translation(16, 16, 3.0)) < 0.01);
    }

    #[test]
    fn test_expansion_is_non_rigid() {
        let flow = expansion(16, 16);
        // divergence 0.4 everywhere against a mean magnitude of ~0.8 per axis
        let ratio = non_rigid_ratio(&flow);
        assert!(ratio > 0.1 && ratio <= 1.0, "ratio = {ratio}");
    }

    #[test]
    fn test_motion_compliance_saturates() {
        let boxes = vec![face(0), face(40), face(80)];
        let flows = vec![expansion(8, 8), expansion(8, 8)];
        let result = score_liveness(&boxes, &flows, 2.0);
        assert_relative_eq!(result.motion_compliance, 1.0);
        assert!(!result.signals.contains(&Signal::LowMotion));
    }

    #[test]
    fn test_no_faces_uses_neutral_ratio() {
        let boxes = vec![None, None, None];
        let flows = vec![translation(8, 8, 1.0); 2];
        let result = score_liveness(&boxes, &flows, 2.0);
        assert_relative_eq!(result.non_rigid_ratio, 0.5);
        assert_relative_eq!(result.score, 0.3);
        assert!(!result.signals.contains(&Signal::LowMotion));
    }

    #[test]
    fn test_pair_skipped_when_later_frame_has_no_face() {
        let boxes = vec![face(0), None, face(0)];
        let flows = vec![expansion(8, 8), translation(8, 8, 2.0)];
        let result = score_liveness(&boxes, &flows, 2.0);
        assert_relative_eq!(result.non_rigid_ratio, non_rigid_ratio(&translation(8, 8, 2.0)));
    }
}
