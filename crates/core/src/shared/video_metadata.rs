#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Frame count reported by the container; 0 when unknown.
    pub total_frames: usize,
    pub codec: String,
}

impl VideoMetadata {
    /// Frame rate usable as a sampling rate, or `fallback` when the container
    /// reported none.
    pub fn sample_rate(&self, fallback: f64) -> f64 {
        if self.fps.is_finite() && self.fps > 0.0 {
            self.fps
        } else {
            fallback
        }
    }
}
