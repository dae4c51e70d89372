//! Grayscale plane operations used by the detectors and scorers.
//!
//! Planes are `Array2<f32>` indexed `[row, col]` holding 0-255 intensities.

use ndarray::Array2;

/// Mirrors an out-of-range index back into `0..len` without repeating the
/// edge sample (`dcb|abcd|cba` style).
fn reflect101(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let n = len as isize;
    let mut i = i;
    while i < 0 || i >= n {
        if i < 0 {
            i = -i;
        }
        if i >= n {
            i = 2 * (n - 1) - i;
        }
    }
    i as usize
}

/// 4-neighbour Laplacian with reflect-101 borders.
pub fn laplacian(plane: &Array2<f32>) -> Array2<f64> {
    let (h, w) = plane.dim();
    Array2::from_shape_fn((h, w), |(y, x)| {
        let (yi, xi) = (y as isize, x as isize);
        let up = plane[[reflect101(yi - 1, h), x]] as f64;
        let down = plane[[reflect101(yi + 1, h), x]] as f64;
        let left = plane[[y, reflect101(xi - 1, w)]] as f64;
        let right = plane[[y, reflect101(xi + 1, w)]] as f64;
        up + down + left + right - 4.0 * plane[[y, x]] as f64
    })
}

/// Variance of the Laplacian, the usual focus/sharpness measure.
pub fn laplacian_variance(plane: &Array2<f32>) -> f64 {
    if plane.is_empty() {
        return 0.0;
    }
    let lap = laplacian(plane);
    let n = lap.len() as f64;
    let mean = lap.sum() / n;
    lap.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n
}

pub fn plane_mean(plane: &Array2<f32>) -> f64 {
    if plane.is_empty() {
        return 0.0;
    }
    plane.iter().map(|&v| v as f64).sum::<f64>() / plane.len() as f64
}

/// Population variance of the plane's samples.
pub fn plane_variance(plane: &Array2<f32>) -> f64 {
    if plane.is_empty() {
        return 0.0;
    }
    let mean = plane_mean(plane);
    plane
        .iter()
        .map(|&v| (v as f64 - mean) * (v as f64 - mean))
        .sum::<f64>()
        / plane.len() as f64
}

/// Derivative along rows (`axis = 0`) or columns (`axis = 1`).
///
/// Central differences inside, one-sided differences at the borders. An axis
/// of length 1 has zero derivative.
pub fn gradient(plane: &Array2<f32>, axis: usize) -> Array2<f32> {
    let (h, w) = plane.dim();
    let len = if axis == 0 { h } else { w };
    Array2::from_shape_fn((h, w), |(y, x)| {
        if len < 2 {
            return 0.0;
        }
        let i = if axis == 0 { y } else { x };
        let at = |k: usize| {
            if axis == 0 {
                plane[[k, x]]
            } else {
                plane[[y, k]]
            }
        };
        if i == 0 {
            at(1) - at(0)
        } else if i == len - 1 {
            at(len - 1) - at(len - 2)
        } else {
            (at(i + 1) - at(i - 1)) * 0.5
        }
    })
}

/// Histogram equalization of an 8-bit plane.
pub fn equalize_histogram(plane: &Array2<f32>) -> Array2<f32> {
    if plane.is_empty() {
        return plane.clone();
    }
    let mut hist = [0usize; 256];
    for &v in plane.iter() {
        hist[v.clamp(0.0, 255.0) as usize] += 1;
    }
    let total = plane.len();
    let Some(first) = hist.iter().position(|&c| c > 0) else {
        return plane.clone();
    };
    if hist[first] == total {
        return plane.mapv(|_| first as f32);
    }

    let scale = 255.0 / (total - hist[first]) as f64;
    let mut lut = [0f32; 256];
    let mut acc = 0usize;
    for i in first + 1..256 {
        acc += hist[i];
        lut[i] = (acc as f64 * scale).round().clamp(0.0, 255.0) as f32;
    }
    plane.mapv(|v| lut[v.clamp(0.0, 255.0) as usize])
}

/// Area-averaging resize to `(new_h, new_w)`.
pub fn resize_area(plane: &Array2<f32>, new_h: usize, new_w: usize) -> Array2<f32> {
    let (h, w) = plane.dim();
    if new_h == 0 || new_w == 0 || h == 0 || w == 0 {
        return Array2::zeros((new_h, new_w));
    }
    Array2::from_shape_fn((new_h, new_w), |(y, x)| {
        let y0 = y * h / new_h;
        let y1 = ((y + 1) * h / new_h).max(y0 + 1).min(h);
        let x0 = x * w / new_w;
        let x1 = ((x + 1) * w / new_w).max(x0 + 1).min(w);
        let mut sum = 0.0f32;
        for yy in y0..y1 {
            for xx in x0..x1 {
                sum += plane[[yy, xx]];
            }
        }
        sum / ((y1 - y0) * (x1 - x0)) as f32
    })
}

/// Bilinear sample at a fractional position, clamping to the border.
pub fn bilinear_sample(plane: &Array2<f32>, y: f32, x: f32) -> f32 {
    let (h, w) = plane.dim();
    let y = y.clamp(0.0, (h - 1) as f32);
    let x = x.clamp(0.0, (w - 1) as f32);
    let y0 = y.floor() as usize;
    let x0 = x.floor() as usize;
    let y1 = (y0 + 1).min(h - 1);
    let x1 = (x0 + 1).min(w - 1);
    let fy = y - y0 as f32;
    let fx = x - x0 as f32;
    let top = plane[[y0, x0]] * (1.0 - fx) + plane[[y0, x1]] * fx;
    let bottom = plane[[y1, x0]] * (1.0 - fx) + plane[[y1, x1]] * fx;
    top * (1.0 - fy) + bottom * fy
}
