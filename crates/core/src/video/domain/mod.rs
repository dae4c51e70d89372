pub mod container_format;
pub mod video_decoder;
pub mod video_reader;
