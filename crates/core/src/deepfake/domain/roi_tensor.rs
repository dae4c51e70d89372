use image::imageops::FilterType;
use ndarray::{Array3, ArrayView3};

use crate::shared::constants::{ROI_TENSOR_MEAN, ROI_TENSOR_SIZE, ROI_TENSOR_STD};
use crate::shared::frame::Frame;

/// Fixed-size model input: a face crop resized to a square and normalized
/// per channel, laid out channel-first (`[3, H, W]`).
#[derive(Clone, Debug, PartialEq)]
pub struct RoiTensor {
    data: Array3<f32>,
}

impl RoiTensor {
    /// Tensor standing in for a frame without a usable face.
    pub fn empty() -> Self {
        Self {
            data: Array3::zeros((3, 0, 0)),
        }
    }

    pub fn from_roi(roi: &Frame) -> Self {
        Self::with_size(roi, ROI_TENSOR_SIZE)
    }

    pub fn with_size(roi: &Frame, size: u32) -> Self {
        if roi.is_empty() || roi.channels() != 3 {
            return Self::empty();
        }
        let Some(img) = image::RgbImage::from_raw(roi.width(), roi.height(), roi.data().to_vec())
        else {
            return Self::empty();
        };
        let resized = image::imageops::resize(&img, size, size, FilterType::Triangle);

        let side = size as usize;
        let mut data = Array3::zeros((3, side, side));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                let v = pixel.0[c] as f32 / 255.0;
                data[[c, y as usize, x as usize]] = (v - ROI_TENSOR_MEAN[c]) / ROI_TENSOR_STD[c];
            }
        }
        Self { data }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    /// Undoes the normalization into 8-bit RGB, height-width-channel order.
    pub fn to_rgb8(&self) -> Array3<u8> {
        let (_, h, w) = self.data.dim();
        Array3::from_shape_fn((h, w, 3), |(y, x, c)| {
            let v = (self.data[[c, y, x]] * ROI_TENSOR_STD[c] + ROI_TENSOR_MEAN[c]) * 255.0;
            v.round().clamp(0.0, 255.0) as u8
        })
    }
}
