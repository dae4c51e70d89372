//! Face-video liveness scoring.
//!
//! [`pipeline::analyze_video_use_case::AnalyzeVideoUseCase`] turns a WebM or
//! MP4 buffer into a bounded [`pipeline::score_set::ScoreSet`]: image quality,
//! motion liveness, presage features, an rPPG pulse estimate and a deepfake
//! likelihood, plus machine-readable signal tags.

pub mod deepfake;
pub mod detection;
pub mod motion;
pub mod pipeline;
pub mod pulse;
pub mod quality;
pub mod sampling;
pub mod shared;
pub mod video;
