use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Domain interface for finding the face in a single frame.
///
/// Locators carry no temporal state, so one instance can be shared by the
/// per-frame worker pool. Returned boxes must lie inside the frame.
pub trait FaceLocator: Send + Sync {
    fn locate(&self, frame: &Frame) -> Option<BoundingBox>;
}
