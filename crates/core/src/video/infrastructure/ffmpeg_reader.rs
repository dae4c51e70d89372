use std::error::Error;
use std::path::Path;

use ffmpeg_next::format::context::Input;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling::{Context as Scaler, Flags};
use ffmpeg_next::util::frame::video::Video as VideoFrame;
use ffmpeg_next::{decoder, media, Rational};

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

/// Demuxes and decodes the best video stream of a file with libav*, converting
/// every picture to tightly packed RGB24.
#[derive(Default)]
pub struct FfmpegReader {
    session: Option<DecodeSession>,
}

/// Everything that lives between `open` and `close`.
struct DecodeSession {
    input: Input,
    decoder: decoder::Video,
    to_rgb: Scaler,
    stream_index: usize,
}

impl FfmpegReader {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Frames per second from a stream rate; 0 when the rate is unset.
fn rate_to_fps(rate: Rational) -> f64 {
    if rate.numerator() == 0 || rate.denominator() == 0 {
        0.0
    } else {
        f64::from(rate)
    }
}

impl VideoReader for FfmpegReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn Error>> {
        ffmpeg_next::init()?;
        let input = ffmpeg_next::format::input(path)?;

        let (stream_index, fps, total_frames, parameters) = {
            let stream = input
                .streams()
                .best(media::Type::Video)
                .ok_or("container has no video stream")?;
            // Browser recorders often leave avg_frame_rate unset.
            let fps = match rate_to_fps(stream.avg_frame_rate()) {
                f if f > 0.0 => f,
                _ => rate_to_fps(stream.rate()),
            };
            (
                stream.index(),
                fps,
                usize::try_from(stream.frames()).unwrap_or(0),
                stream.parameters(),
            )
        };

        let decoder = ffmpeg_next::codec::context::Context::from_parameters(parameters)?
            .decoder()
            .video()?;
        let (width, height) = (decoder.width(), decoder.height());
        let to_rgb = Scaler::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            Flags::BILINEAR,
        )?;
        let codec = decoder
            .codec()
            .map(|c| c.name().to_string())
            .unwrap_or_default();

        self.session = Some(DecodeSession {
            input,
            decoder,
            to_rgb,
            stream_index,
        });

        Ok(VideoMetadata {
            width,
            height,
            fps,
            total_frames,
            codec,
        })
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn Error>>> + '_> {
        match self.session.as_mut() {
            Some(session) => Box::new(DecodedFrames {
                session,
                phase: Phase::Reading,
                next_index: 0,
            }),
            None => Box::new(std::iter::once(Err("reader is not open".into()))),
        }
    }

    fn close(&mut self) {
        self.session = None;
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Feeding packets from the demuxer.
    Reading,
    /// EOF sent; collecting the decoder's buffered pictures.
    Draining,
    Finished,
}

struct DecodedFrames<'a> {
    session: &'a mut DecodeSession,
    phase: Phase,
    next_index: usize,
}

impl DecodedFrames<'_> {
    /// Takes the next finished picture out of the decoder, if any.
    fn receive(&mut self) -> Option<Result<Frame, Box<dyn Error>>> {
        let mut picture = VideoFrame::empty();
        self.session.decoder.receive_frame(&mut picture).ok()?;

        let mut rgb = VideoFrame::empty();
        if let Err(e) = self.session.to_rgb.run(&picture, &mut rgb) {
            return Some(Err(Box::new(e)));
        }
        let (width, height) = (rgb.width(), rgb.height());
        let frame = Frame::new(packed_rgb(&rgb), width, height, 3, self.next_index);
        self.next_index += 1;
        Some(Ok(frame))
    }

    /// Sends the next packet of our stream; false once the demuxer is empty.
    fn feed(&mut self) -> bool {
        let session = &mut *self.session;
        for (stream, packet) in session.input.packets() {
            if stream.index() != session.stream_index {
                continue;
            }
            match session.decoder.send_packet(&packet) {
                Ok(()) => return true,
                Err(e) => log::debug!("Dropping undecodable packet: {e}"),
            }
        }
        false
    }
}

impl Iterator for DecodedFrames<'_> {
    type Item = Result<Frame, Box<dyn Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.phase {
                Phase::Finished => return None,
                Phase::Reading => {
                    if let Some(frame) = self.receive() {
                        return Some(frame);
                    }
                    if !self.feed() {
                        if let Err(e) = self.session.decoder.send_eof() {
                            log::debug!("Decoder rejected EOF: {e}");
                        }
                        self.phase = Phase::Draining;
                    }
                }
                Phase::Draining => {
                    let frame = self.receive();
                    if frame.is_none() {
                        self.phase = Phase::Finished;
                    }
                    return frame;
                }
            }
        }
    }
}

/// Row-by-row copy that drops libav's line padding.
fn packed_rgb(rgb: &VideoFrame) -> Vec<u8> {
    let row_bytes = rgb.width() as usize * 3;
    let stride = rgb.stride(0);
    rgb.data(0)
        .chunks(stride)
        .take(rgb.height() as usize)
        .flat_map(|row| &row[..row_bytes])
        .copied()
        .collect()
}
