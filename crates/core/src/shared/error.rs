use std::path::PathBuf;

use thiserror::Error;

use crate::shared::signal::Signal;

/// Conditions that stop an analysis before any scoring happens.
///
/// The pipeline never surfaces these as `Err`; they are turned into a zeroed
/// score set carrying [`AnalysisError::signal`].
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("could not open video container: {0}")]
    DecodeFailed(String),
    #[error("video contained no decodable frames")]
    NoFrames,
    #[error("frame sampling produced no frames")]
    NoSampledFrames,
}

impl AnalysisError {
    pub fn signal(&self) -> Signal {
        match self {
            AnalysisError::DecodeFailed(_) => Signal::DecodeFailed,
            AnalysisError::NoFrames => Signal::NoFrames,
            AnalysisError::NoSampledFrames => Signal::NoSampledFrames,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{field} must be {requirement}, got {value}")]
    Invalid {
        field: &'static str,
        requirement: &'static str,
        value: String,
    },
}
