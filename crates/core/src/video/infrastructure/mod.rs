pub mod ffmpeg_reader;
pub mod scratch_file_decoder;

#[cfg(test)]
pub(crate) mod test_video;
