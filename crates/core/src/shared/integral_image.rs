use ndarray::Array2;

/// Summed-area table over a plane, with an optional table of squares.
///
/// Stored with a zero first row and column so any rectangle sum costs four
/// lookups.
pub struct IntegralImage {
    sum: Array2<f64>,
    sq_sum: Option<Array2<f64>>,
}

impl IntegralImage {
    pub fn new(plane: &Array2<f32>) -> Self {
        Self {
            sum: Self::table(plane, |v| v),
            sq_sum: None,
        }
    }

    /// Also tracks squared values so window variance can be read back.
    pub fn with_squares(plane: &Array2<f32>) -> Self {
        Self {
            sum: Self::table(plane, |v| v),
            sq_sum: Some(Self::table(plane, |v| v * v)),
        }
    }

    fn table(plane: &Array2<f32>, f: impl Fn(f64) -> f64) -> Array2<f64> {
        let (h, w) = plane.dim();
        let mut t = Array2::zeros((h + 1, w + 1));
        for y in 0..h {
            let mut row = 0.0;
            for x in 0..w {
                row += f(plane[[y, x]] as f64);
                t[[y + 1, x + 1]] = t[[y, x + 1]] + row;
            }
        }
        t
    }

    fn rect(t: &Array2<f64>, x: usize, y: usize, w: usize, h: usize) -> f64 {
        t[[y + h, x + w]] - t[[y, x + w]] - t[[y + h, x]] + t[[y, x]]
    }

    /// Sum over `w` x `h` pixels starting at `(x, y)`; the rectangle must lie
    /// inside the plane.
    pub fn sum(&self, x: usize, y: usize, w: usize, h: usize) -> f64 {
        Self::rect(&self.sum, x, y, w, h)
    }

    pub fn mean(&self, x: usize, y: usize, w: usize, h: usize) -> f64 {
        let n = (w * h) as f64;
        if n == 0.0 {
            return 0.0;
        }
        self.sum(x, y, w, h) / n
    }

    /// Population standard deviation of a rectangle. Zero when squares were
    /// not tracked.
    pub fn std_dev(&self, x: usize, y: usize, w: usize, h: usize) -> f64 {
        let Some(sq) = &self.sq_sum else {
            return 0.0;
        };
        let n = (w * h) as f64;
        if n == 0.0 {
            return 0.0;
        }
        let mean = self.sum(x, y, w, h) / n;
        let var = Self::rect(sq, x, y, w, h) / n - mean * mean;
        var.max(0.0).sqrt()
    }

    /// Box sum centred on `(x, y)` with the given radius, clipped to the plane.
    pub fn window_sum(&self, x: usize, y: usize, radius: usize) -> f64 {
        let (th, tw) = self.sum.dim();
        let (h, w) = (th - 1, tw - 1);
        let x0 = x.saturating_sub(radius);
        let y0 = y.saturating_sub(radius);
        let x1 = (x + radius + 1).min(w);
        let y1 = (y + radius + 1).min(h);
        self.sum(x0, y0, x1 - x0, y1 - y0)
    }
}
