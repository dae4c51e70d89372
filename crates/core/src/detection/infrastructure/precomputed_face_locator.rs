use std::collections::HashMap;
use std::sync::Arc;

use crate::detection::domain::face_locator::FaceLocator;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Replays face boxes computed elsewhere, keyed by frame index.
///
/// Lets callers that already ran an external detector feed its results into
/// the scorers. Boxes are clamped to the frame they are returned for.
pub struct PrecomputedFaceLocator {
    boxes: Arc<HashMap<usize, BoundingBox>>,
}

impl PrecomputedFaceLocator {
    pub fn new(boxes: Arc<HashMap<usize, BoundingBox>>) -> Self {
        Self { boxes }
    }

    /// Same box for every frame.
    pub fn fixed(bbox: BoundingBox, frame_count: usize) -> Self {
        Self::new(Arc::new((0..frame_count).map(|i| (i, bbox)).collect()))
    }
}

impl FaceLocator for PrecomputedFaceLocator {
    fn locate(&self, frame: &Frame) -> Option<BoundingBox> {
        self.boxes
            .get(&frame.index())
            .and_then(|b| b.clamp_to(frame.width(), frame.height()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(index: usize) -> Frame {
        Frame::new(vec![0u8; 100 * 100 * 3], 100, 100, 3, index)
    }

    #[test]
    fn test_returns_box_for_known_frame() {
        let bbox = BoundingBox::new(10, 20, 50, 50);
        let locator = PrecomputedFaceLocator::new(Arc::new(HashMap::from([(0, bbox)])));
        assert_eq!(locator.locate(&frame(0)), Some(bbox));
    }

    #[test]
    fn test_returns_none_for_unknown_frame() {
        let locator =
            PrecomputedFaceLocator::new(Arc::new(HashMap::from([(0, BoundingBox::new(0, 0, 5, 5))])));
        assert_eq!(locator.locate(&frame(5)), None);
    }

    #[test]
    fn test_clamps_to_frame() {
        let locator = PrecomputedFaceLocator::fixed(BoundingBox::new(80, 80, 50, 50), 3);
        assert_eq!(
            locator.locate(&frame(2)),
            Some(BoundingBox::new(80, 80, 20, 20))
        );
    }

    #[test]
    fn test_fixed_covers_requested_frames_only() {
        let locator = PrecomputedFaceLocator::fixed(BoundingBox::new(0, 0, 10, 10), 2);
        assert!(locator.locate(&frame(1)).is_some());
        assert!(locator.locate(&frame(2)).is_none());
    }
}
