use std::fmt;

use serde::{Deserialize, Serialize};

/// Machine-readable condition tags surfaced next to the numeric scores.
///
/// Serialized in `snake_case`; consumers match on the string form and must
/// tolerate tags they do not know.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    DecodeFailed,
    NoFrames,
    NoFramesToSample,
    NoSampledFrames,
    MaxFramesLimited,
    LowFrameCount,
    NoRois,
    LowFacePresence,
    BlurryVideo,
    PoorLighting,
    InsufficientFramesForLiveness,
    LowMotion,
    RigidMotionSuspected,
    LowMicroMotion,
    UnnaturalMotion,
    PeriodicPatternDetected,
    TemporalInconsistencyDetected,
    UsingHeuristicModel,
    InsufficientFramesForPulse,
    FaceNotConsistentlyDetected,
    NoMicroMotionStaticImageSuspected,
    NoCardiacSignalDetected,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::DecodeFailed => "decode_failed",
            Signal::NoFrames => "no_frames",
            Signal::NoFramesToSample => "no_frames_to_sample",
            Signal::NoSampledFrames => "no_sampled_frames",
            Signal::MaxFramesLimited => "max_frames_limited",
            Signal::LowFrameCount => "low_frame_count",
            Signal::NoRois => "no_rois",
            Signal::LowFacePresence => "low_face_presence",
            Signal::BlurryVideo => "blurry_video",
            Signal::PoorLighting => "poor_lighting",
            Signal::InsufficientFramesForLiveness => "insufficient_frames_for_liveness",
            Signal::LowMotion => "low_motion",
            Signal::RigidMotionSuspected => "rigid_motion_suspected",
            Signal::LowMicroMotion => "low_micro_motion",
            Signal::UnnaturalMotion => "unnatural_motion",
            Signal::PeriodicPatternDetected => "periodic_pattern_detected",
            Signal::TemporalInconsistencyDetected => "temporal_inconsistency_detected",
            Signal::UsingHeuristicModel => "using_heuristic_model",
            Signal::InsufficientFramesForPulse => "insufficient_frames_for_pulse",
            Signal::FaceNotConsistentlyDetected => "face_not_consistently_detected",
            Signal::NoMicroMotionStaticImageSuspected => {
                "no_micro_motion_static_image_suspected"
            }
            Signal::NoCardiacSignalDetected => "no_cardiac_signal_detected",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
