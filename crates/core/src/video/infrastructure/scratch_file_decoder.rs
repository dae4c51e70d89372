use std::io::Write;

use crate::shared::error::AnalysisError;
use crate::shared::frame::Frame;
use crate::video::domain::container_format::ContainerFormat;
use crate::video::domain::video_decoder::{DecodedVideo, VideoDecoder};
use crate::video::domain::video_reader::VideoReader;
use crate::video::infrastructure::ffmpeg_reader::FfmpegReader;

/// Builds a fresh reader per decode so the decoder itself stays shareable.
pub type ReaderFactory = fn() -> Box<dyn VideoReader>;

fn ffmpeg_reader() -> Box<dyn VideoReader> {
    Box::new(FfmpegReader::new())
}

/// Decodes an in-memory buffer by spilling it to a named temporary file.
///
/// The demuxer needs a seekable path; the scratch file carries the sniffed
/// container's suffix and is removed when the guard drops, on every exit path.
pub struct ScratchFileDecoder {
    reader_factory: ReaderFactory,
}

impl ScratchFileDecoder {
    pub fn new() -> Self {
        Self::with_reader_factory(ffmpeg_reader)
    }

    pub fn with_reader_factory(reader_factory: ReaderFactory) -> Self {
        Self { reader_factory }
    }

    fn write_scratch(
        bytes: &[u8],
        container: ContainerFormat,
    ) -> Result<tempfile::NamedTempFile, AnalysisError> {
        let mut scratch = tempfile::Builder::new()
            .prefix("liveguard-")
            .suffix(container.scratch_suffix())
            .tempfile()
            .map_err(|e| AnalysisError::DecodeFailed(format!("scratch file: {e}")))?;
        scratch
            .write_all(bytes)
            .and_then(|_| scratch.flush())
            .map_err(|e| AnalysisError::DecodeFailed(format!("scratch file: {e}")))?;
        Ok(scratch)
    }
}

impl Default for ScratchFileDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoDecoder for ScratchFileDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedVideo, AnalysisError> {
        let container = ContainerFormat::sniff(bytes);
        let scratch = Self::write_scratch(bytes, container)?;
        log::debug!(
            "Decoding {} bytes as {:?} via {}",
            bytes.len(),
            container,
            scratch.path().display()
        );

        let mut reader = (self.reader_factory)();
        let metadata = reader
            .open(scratch.path())
            .map_err(|e| AnalysisError::DecodeFailed(e.to_string()))?;

        let mut frames: Vec<Frame> = Vec::new();
        for result in reader.frames() {
            match result {
                Ok(frame) => frames.push(frame),
                Err(e) if frames.is_empty() => {
                    return Err(AnalysisError::DecodeFailed(e.to_string()));
                }
                Err(e) => {
                    log::warn!(
                        "Decode stopped after {} frames: {e}",
                        frames.len()
                    );
                    break;
                }
            }
        }
        reader.close();

        if frames.is_empty() {
            return Err(AnalysisError::NoFrames);
        }

        log::debug!(
            "Decoded {} frames ({}x{} @ {:.2} fps, {})",
            frames.len(),
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.codec
        );

        Ok(DecodedVideo {
            frames,
            metadata,
            container,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::video_metadata::VideoMetadata;
    use crate::video::infrastructure::test_video::test_video_bytes;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    static OPENED: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());

    /// Records the scratch path it was handed, then fails like a bad container.
    struct RecordingReader;

    impl VideoReader for RecordingReader {
        fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            assert!(path.exists());
            OPENED.lock().unwrap().push(path.to_path_buf());
            Err("unsupported container".into())
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            Box::new(std::iter::empty())
        }

        fn close(&mut self) {}
    }

    struct EmptyReader;

    impl VideoReader for EmptyReader {
        fn open(&mut self, _path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            Ok(VideoMetadata {
                width: 4,
                height: 4,
                fps: 30.0,
                total_frames: 0,
                codec: "stub".into(),
            })
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            Box::new(std::iter::empty())
        }

        fn close(&mut self) {}
    }

    struct TruncatedReader;

    impl VideoReader for TruncatedReader {
        fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            EmptyReader.open(path)
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            let good = (0..2).map(|i| Ok(Frame::new(vec![0; 48], 4, 4, 3, i)));
            let bad = std::iter::once(Err("corrupt packet".into()));
            Box::new(good.chain(bad))
        }

        fn close(&mut self) {}
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let decoder = ScratchFileDecoder::new();
        let result = decoder.decode(b"this is not a video container");
        assert!(matches!(result, Err(AnalysisError::DecodeFailed(_))));
    }

    #[test]
    fn test_valid_mp4_decodes_all_frames() {
        let bytes = test_video_bytes(6, 64, 48);
        let decoded = ScratchFileDecoder::new().decode(&bytes).unwrap();
        assert_eq!(decoded.frames.len(), 6);
        assert_eq!(decoded.container, ContainerFormat::Mp4);
        assert_eq!(decoded.metadata.width, 64);
        assert_eq!(decoded.frames[0].height(), 48);
    }

    #[test]
    fn test_scratch_file_removed_after_failed_decode() {
        let decoder = ScratchFileDecoder::with_reader_factory(|| Box::new(RecordingReader));
        let webm = [0x1a, 0x45, 0xdf, 0xa3, 0x00];
        assert!(matches!(
            decoder.decode(&webm),
            Err(AnalysisError::DecodeFailed(_))
        ));

        let opened = OPENED.lock().unwrap();
        let path = opened.last().unwrap();
        assert!(path.to_string_lossy().ends_with(".webm"));
        assert!(!path.exists());
    }

    #[test]
    fn test_empty_stream_is_no_frames() {
        let decoder = ScratchFileDecoder::with_reader_factory(|| Box::new(EmptyReader));
        assert!(matches!(decoder.decode(b"x"), Err(AnalysisError::NoFrames)));
    }

    #[test]
    fn test_mid_stream_error_keeps_decoded_frames() {
        let decoder = ScratchFileDecoder::with_reader_factory(|| Box::new(TruncatedReader));
        let decoded = decoder.decode(b"x").unwrap();
        assert_eq!(decoded.frames.len(), 2);
    }
}
