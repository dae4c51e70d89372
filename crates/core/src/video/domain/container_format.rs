use crate::shared::constants::{EBML_MAGIC, SCRATCH_SUFFIX_MP4, SCRATCH_SUFFIX_WEBM};

/// Supported video containers, told apart by their leading bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerFormat {
    Webm,
    /// MP4 / QuickTime; also the assumption for anything unrecognised.
    Mp4,
}

impl ContainerFormat {
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(&EBML_MAGIC) {
            ContainerFormat::Webm
        } else {
            ContainerFormat::Mp4
        }
    }

    /// File suffix that lets the demuxer probe the scratch copy correctly.
    pub fn scratch_suffix(&self) -> &'static str {
        match self {
            ContainerFormat::Webm => SCRATCH_SUFFIX_WEBM,
            ContainerFormat::Mp4 => SCRATCH_SUFFIX_MP4,
        }
    }
}
