pub mod bounding_box;
pub mod config;
pub mod constants;
pub mod error;
pub mod frame;
pub mod image_ops;
pub mod integral_image;
pub mod math;
pub mod signal;
pub mod video_metadata;
