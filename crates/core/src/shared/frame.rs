use ndarray::Array2;

use crate::shared::bounding_box::BoundingBox;

/// A single decoded video frame: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only; analysis code reads
/// the derived grayscale plane, channel means or owned crops.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// BT.601 luma plane, rounded to integer intensities like an 8-bit
    /// grayscale conversion.
    pub fn luma(&self) -> Array2<f32> {
        let (h, w) = (self.height as usize, self.width as usize);
        let c = self.channels as usize;
        if c < 3 {
            return Array2::from_shape_fn((h, w), |(y, x)| self.data[(y * w + x) * c] as f32);
        }
        Array2::from_shape_fn((h, w), |(y, x)| {
            let p = (y * w + x) * c;
            let r = self.data[p] as f32;
            let g = self.data[p + 1] as f32;
            let b = self.data[p + 2] as f32;
            (0.299 * r + 0.587 * g + 0.114 * b).round()
        })
    }

    /// Mean of one colour channel over the whole frame; 0 for empty frames.
    pub fn channel_mean(&self, channel: usize) -> f64 {
        let c = self.channels as usize;
        if self.data.is_empty() || channel >= c {
            return 0.0;
        }
        let sum: u64 = self
            .data
            .iter()
            .skip(channel)
            .step_by(c)
            .map(|&v| v as u64)
            .sum();
        sum as f64 / (self.data.len() / c) as f64
    }

    /// Copies the pixels under `bbox`, which must already lie inside the frame.
    pub fn crop(&self, bbox: &BoundingBox) -> Frame {
        let channels = self.channels as usize;
        let row_len = bbox.w as usize * channels;
        let mut data = Vec::with_capacity(row_len * bbox.h as usize);
        for row in bbox.y as usize..(bbox.y + bbox.h) as usize {
            let start = (row * self.width as usize + bbox.x as usize) * channels;
            data.extend_from_slice(&self.data[start..start + row_len]);
        }
        Frame::new(data, bbox.w as u32, bbox.h as u32, self.channels, self.index)
    }
}
