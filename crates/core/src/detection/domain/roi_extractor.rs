use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Cuts the face region out of `frame`.
///
/// The box is clamped to the frame first; `None` when it clamps to nothing.
pub fn extract_face_roi(frame: &Frame, bbox: &BoundingBox) -> Option<Frame> {
    if frame.is_empty() {
        return None;
    }
    let clamped = bbox.clamp_to(frame.width(), frame.height())?;
    Some(frame.crop(&clamped))
}
