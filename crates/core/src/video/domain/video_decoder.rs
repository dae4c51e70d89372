use crate::shared::error::AnalysisError;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::container_format::ContainerFormat;

/// A fully decoded clip: every frame in decode order.
#[derive(Clone, Debug)]
pub struct DecodedVideo {
    pub frames: Vec<Frame>,
    pub metadata: VideoMetadata,
    pub container: ContainerFormat,
}

/// Turns an in-memory video buffer into frames.
///
/// Fails with [`AnalysisError::DecodeFailed`] when the container cannot be
/// opened and [`AnalysisError::NoFrames`] when it decodes to nothing.
pub trait VideoDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedVideo, AnalysisError>;
}
