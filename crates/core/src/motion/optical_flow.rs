use ndarray::{Array2, Zip};

use crate::shared::image_ops::{bilinear_sample, gradient, resize_area};
use crate::shared::integral_image::IntegralImage;

const PYRAMID_LEVELS: usize = 3;
const WINDOW_SIZE: usize = 15;
const ITERATIONS: usize = 3;
/// Smallest pyramid level side; coarser levels are not built.
const MIN_LEVEL_SIDE: usize = 8;
/// Minimum eigenvalue of the per-pixel structure tensor, per window pixel.
/// Pixels below it have no usable texture and keep a zero increment.
const MIN_EIGENVALUE: f64 = 1e-2;

/// Dense per-pixel displacement between two grayscale planes.
#[derive(Clone, Debug, PartialEq)]
pub struct OpticalFlowField {
    dx: Array2<f32>,
    dy: Array2<f32>,
}

impl OpticalFlowField {
    pub fn new(dx: Array2<f32>, dy: Array2<f32>) -> Self {
        debug_assert_eq!(dx.dim(), dy.dim(), "flow components must share a shape");
        Self { dx, dy }
    }

    pub fn zeros(height: usize, width: usize) -> Self {
        Self::new(Array2::zeros((height, width)), Array2::zeros((height, width)))
    }

    pub fn dx(&self) -> &Array2<f32> {
        &self.dx
    }

    pub fn dy(&self) -> &Array2<f32> {
        &self.dy
    }

    pub fn dim(&self) -> (usize, usize) {
        self.dx.dim()
    }

    pub fn is_empty(&self) -> bool {
        self.dx.is_empty()
    }

    /// `(mean |dx|, mean |dy|)`; zero for an empty field.
    pub fn mean_abs(&self) -> (f64, f64) {
        (mean_abs(&self.dx), mean_abs(&self.dy))
    }

    /// `mean(|dx|, |dy|)` over both components.
    pub fn motion_energy(&self) -> f64 {
        let (mx, my) = self.mean_abs();
        (mx + my) / 2.0
    }

    /// `∂dx/∂x + ∂dy/∂y`
    pub fn divergence(&self) -> Array2<f32> {
        gradient(&self.dx, 1) + gradient(&self.dy, 0)
    }

    /// `∂dy/∂x − ∂dx/∂y`
    pub fn curl(&self) -> Array2<f32> {
        gradient(&self.dy, 1) - gradient(&self.dx, 0)
    }

    /// Mean absolute component-wise difference to another field of the same
    /// shape; 0 when the shapes differ or the fields are empty.
    pub fn mean_abs_difference(&self, other: &OpticalFlowField) -> f64 {
        if self.dim() != other.dim() || self.is_empty() {
            return 0.0;
        }
        let mut total = 0.0f64;
        Zip::from(&self.dx)
            .and(&other.dx)
            .for_each(|&a, &b| total += (a - b).abs() as f64);
        Zip::from(&self.dy)
            .and(&other.dy)
            .for_each(|&a, &b| total += (a - b).abs() as f64);
        total / (2 * self.dx.len()) as f64
    }
}

fn mean_abs(plane: &Array2<f32>) -> f64 {
    if plane.is_empty() {
        return 0.0;
    }
    plane.iter().map(|v| v.abs() as f64).sum::<f64>() / plane.len() as f64
}

/// Pyramidal dense Lucas–Kanade estimator.
///
/// Each pixel solves the 2x2 normal equations over a square integration
/// window (box sums through integral images), refining the warp a few times
/// per level from coarse to fine.
#[derive(Clone, Debug)]
pub struct DenseFlowEstimator {
    levels: usize,
    window: usize,
    iterations: usize,
}

impl DenseFlowEstimator {
    pub fn new() -> Self {
        Self {
            levels: PYRAMID_LEVELS,
            window: WINDOW_SIZE,
            iterations: ITERATIONS,
        }
    }

    /// Flow that carries `prev` onto `next`. Planes of different shape
    /// produce a zero field shaped like `prev`.
    pub fn estimate(&self, prev: &Array2<f32>, next: &Array2<f32>) -> OpticalFlowField {
        let (h, w) = prev.dim();
        if prev.dim() != next.dim() || prev.is_empty() {
            return OpticalFlowField::zeros(h, w);
        }

        let prev_pyramid = build_pyramid(prev, self.levels);
        let next_pyramid = build_pyramid(next, self.levels);

        let mut flow: Option<OpticalFlowField> = None;
        for (p, n) in prev_pyramid.iter().zip(next_pyramid.iter()).rev() {
            let (lh, lw) = p.dim();
            let init = match flow {
                Some(coarse) => upsample_flow(&coarse, lh, lw),
                None => OpticalFlowField::zeros(lh, lw),
            };
            flow = Some(self.refine(p, n, init));
        }
        flow.unwrap_or_else(|| OpticalFlowField::zeros(h, w))
    }

    fn refine(
        &self,
        prev: &Array2<f32>,
        next: &Array2<f32>,
        mut flow: OpticalFlowField,
    ) -> OpticalFlowField {
        let (h, w) = prev.dim();
        let radius = self.window / 2;
        let ix = gradient(prev, 1);
        let iy = gradient(prev, 0);
        let sxx = IntegralImage::new(&(&ix * &ix));
        let sxy = IntegralImage::new(&(&ix * &iy));
        let syy = IntegralImage::new(&(&iy * &iy));
        let max_step = radius as f64;

        for _ in 0..self.iterations {
            let it = Array2::from_shape_fn((h, w), |(y, x)| {
                let wy = y as f32 + flow.dy[[y, x]];
                let wx = x as f32 + flow.dx[[y, x]];
                bilinear_sample(next, wy, wx) - prev[[y, x]]
            });
            let bx = IntegralImage::new(&(&ix * &it));
            let by = IntegralImage::new(&(&iy * &it));

            for y in 0..h {
                for x in 0..w {
                    let a = sxx.window_sum(x, y, radius);
                    let b = sxy.window_sum(x, y, radius);
                    let c = syy.window_sum(x, y, radius);
                    let n = window_area(x, y, radius, h, w);
                    let min_eig = (a + c) / 2.0 - (((a - c) / 2.0).powi(2) + b * b).sqrt();
                    if min_eig / n < MIN_EIGENVALUE {
                        continue;
                    }
                    let det = a * c - b * b;
                    let ex = -bx.window_sum(x, y, radius);
                    let ey = -by.window_sum(x, y, radius);
                    let du = ((c * ex - b * ey) / det).clamp(-max_step, max_step);
                    let dv = ((a * ey - b * ex) / det).clamp(-max_step, max_step);
                    flow.dx[[y, x]] += du as f32;
                    flow.dy[[y, x]] += dv as f32;
                }
            }
        }
        flow
    }
}

impl Default for DenseFlowEstimator {
    fn default() -> Self {
        Self::new()
    }
}

fn window_area(x: usize, y: usize, radius: usize, h: usize, w: usize) -> f64 {
    let x0 = x.saturating_sub(radius);
    let y0 = y.saturating_sub(radius);
    let x1 = (x + radius + 1).min(w);
    let y1 = (y + radius + 1).min(h);
    ((x1 - x0) * (y1 - y0)) as f64
}

/// Level 0 is the input; each further level halves both sides.
fn build_pyramid(plane: &Array2<f32>, levels: usize) -> Vec<Array2<f32>> {
    let mut pyramid = vec![plane.clone()];
    while pyramid.len() < levels {
        let Some(last) = pyramid.last() else { break };
        let (h, w) = last.dim();
        if h / 2 < MIN_LEVEL_SIDE || w / 2 < MIN_LEVEL_SIDE {
            break;
        }
        let next = resize_area(last, h / 2, w / 2);
        pyramid.push(next);
    }
    pyramid
}

fn upsample_flow(coarse: &OpticalFlowField, h: usize, w: usize) -> OpticalFlowField {
    let (ch, cw) = coarse.dim();
    let sy = ch as f32 / h as f32;
    let sx = cw as f32 / w as f32;
    let up = |plane: &Array2<f32>, gain: f32| {
        Array2::from_shape_fn((h, w), |(y, x)| {
            bilinear_sample(plane, y as f32 * sy, x as f32 * sx) * gain
        })
    };
    OpticalFlowField::new(up(&coarse.dx, 1.0 / sx), up(&coarse.dy, 1.0 / sy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::s;
    use std::f32::consts::PI;

    fn pattern(h: usize, w: usize, shift_x: f32) -> Array2<f32> {
        Array2::from_shape_fn((h, w), |(y, x)| {
            let x = x as f32 - shift_x;
            128.0 + 40.0 * (2.0 * PI * x / 32.0).sin() + 40.0 * (2.0 * PI * y as f32 / 28.0).sin()
        })
    }

    #[test]
    fn test_uniform_planes_give_zero_field() {
        let a = Array2::from_elem((40, 50), 90.0f32);
        let b = Array2::from_elem((40, 50), 140.0f32);
        let flow = DenseFlowEstimator::new().estimate(&a, &b);
        assert_eq!(flow.dim(), (40, 50));
        assert!(flow.dx().iter().all(|&v| v == 0.0));
        assert!(flow.dy().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_identical_planes_give_near_zero_flow() {
        let a = pattern(64, 64, 0.0);
        let flow = DenseFlowEstimator::new().estimate(&a, &a);
        assert!(flow.motion_energy() < 1e-3);
    }

    #[test]
    fn test_recovers_horizontal_translation() {
        let prev = pattern(96, 96, 0.0);
        let next = pattern(96, 96, 1.0);
        let flow = DenseFlowEstimator::new().estimate(&prev, &next);

        let interior = s![24..72, 24..72];
        let dx = flow.dx().slice(interior).mean().unwrap();
        let dy = flow.dy().slice(interior).mean().unwrap();
        assert!((dx - 1.0).abs() < 0.3, "dx = {dx}");
        assert!(dy.abs() < 0.3, "dy = {dy}");
    }

    #[test]
    fn test_shape_mismatch_gives_zero_field() {
        let flow =
            DenseFlowEstimator::new().estimate(&pattern(20, 20, 0.0), &pattern(20, 24, 0.0));
        assert_eq!(flow.dim(), (20, 20));
        assert_relative_eq!(flow.motion_energy(), 0.0);
    }

    #[test]
    fn test_divergence_of_expanding_field() {
        let dx = Array2::from_shape_fn((10, 10), |(_, x)| x as f32 * 0.1);
        let dy = Array2::from_shape_fn((10, 10), |(y, _)| y as f32 * 0.1);
        let flow = OpticalFlowField::new(dx, dy);
        for &v in flow.divergence().iter() {
            assert_relative_eq!(v, 0.2, epsilon = 1e-5);
        }
        for &v in flow.curl().iter() {
            assert_relative_eq!(v, 0.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_curl_of_rotating_field() {
        let dx = Array2::from_shape_fn((10, 10), |(y, _)| -(y as f32) * 0.05);
        let dy = Array2::from_shape_fn((10, 10), |(_, x)| x as f32 * 0.05);
        let flow = OpticalFlowField::new(dx, dy);
        for &v in flow.curl().iter() {
            assert_relative_eq!(v, 0.1, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_mean_abs_difference() {
        let a = OpticalFlowField::zeros(2, 2);
        let b = OpticalFlowField::new(Array2::from_elem((2, 2), 1.0), Array2::from_elem((2, 2), 3.0));
        assert_relative_eq!(a.mean_abs_difference(&b), 2.0);
        assert_relative_eq!(a.mean_abs_difference(&OpticalFlowField::zeros(3, 3)), 0.0);
    }

    #[test]
    fn test_pyramid_stops_at_min_side() {
        let pyramid = build_pyramid(&Array2::zeros((20, 40)), 3);
        assert_eq!(pyramid.len(), 2);
        assert_eq!(pyramid[1].dim(), (10, 20));
    }
}
