/// A face rectangle in frame-pixel coordinates.
///
/// Boxes returned by face locators and by [`BoundingBox::clamp_to`] satisfy
/// `w > 0`, `h > 0`, `x >= 0`, `y >= 0` and lie fully inside the frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Clips the box to a `width` x `height` frame.
    ///
    /// The origin is moved inside the frame first and the extent is then cut
    /// at the far edges. Returns `None` when nothing of the box remains.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<BoundingBox> {
        let x = self.x.max(0);
        let y = self.y.max(0);
        let w = self.w.min(width as i32 - x);
        let h = self.h.min(height as i32 - y);
        if w <= 0 || h <= 0 {
            return None;
        }
        Some(BoundingBox { x, y, w, h })
    }

    /// Integer center, matching `x + w / 2` pixel addressing.
    pub fn center(&self) -> (i32, i32) {
        (self.x + self.w / 2, self.y + self.h / 2)
    }

    pub fn area(&self) -> i64 {
        self.w.max(0) as i64 * self.h.max(0) as i64
    }

    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let ix1 = self.x.max(other.x);
        let iy1 = self.y.max(other.y);
        let ix2 = (self.x + self.w).min(other.x + other.w);
        let iy2 = (self.y + self.h).min(other.y + other.h);

        let inter = (ix2 - ix1).max(0) as f64 * (iy2 - iy1).max(0) as f64;
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() as f64 + other.area() as f64 - inter)
    }

    /// Sub-rectangle given as fractions of this box, relative to the box's own
    /// origin. Fractional edges are truncated toward zero.
    pub fn fraction(&self, rows: (f64, f64), cols: (f64, f64)) -> BoundingBox {
        let y0 = (self.h as f64 * rows.0) as i32;
        let y1 = (self.h as f64 * rows.1) as i32;
        let x0 = (self.w as f64 * cols.0) as i32;
        let x1 = (self.w as f64 * cols.1) as i32;
        BoundingBox {
            x: x0,
            y: y0,
            w: (x1 - x0).max(0),
            h: (y1 - y0).max(0),
        }
    }

    /// Same box in a coordinate system scaled by `factor`.
    pub fn scaled(&self, factor: f64) -> BoundingBox {
        BoundingBox {
            x: (self.x as f64 * factor).round() as i32,
            y: (self.y as f64 * factor).round() as i32,
            w: (self.w as f64 * factor).round() as i32,
            h: (self.h as f64 * factor).round() as i32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_clamp_inside_is_identity() {
        let b = BoundingBox::new(10, 10, 20, 20);
        assert_eq!(b.clamp_to(100, 100), Some(b));
    }

    #[test]
    fn test_clamp_negative_origin_keeps_width() {
        // x is moved to 0, the width is only cut at the far edge
        let b = BoundingBox::new(-5, -5, 20, 20);
        assert_eq!(b.clamp_to(100, 100), Some(BoundingBox::new(0, 0, 20, 20)));
    }

    #[test]
    fn test_clamp_far_edge() {
        let b = BoundingBox::new(90, 80, 20, 40);
        assert_eq!(b.clamp_to(100, 100), Some(BoundingBox::new(90, 80, 10, 20)));
    }

    #[rstest]
    #[case::outside_right(BoundingBox::new(100, 0, 10, 10))]
    #[case::zero_width(BoundingBox::new(0, 0, 0, 10))]
    #[case::negative_height(BoundingBox::new(0, 0, 10, -3))]
    fn test_clamp_empty_returns_none(#[case] b: BoundingBox) {
        assert!(b.clamp_to(100, 100).is_none());
    }

    #[test]
    fn test_center_uses_integer_division() {
        assert_eq!(BoundingBox::new(10, 20, 31, 41).center(), (25, 40));
    }

    #[test]
    fn test_iou_identical() {
        let a = BoundingBox::new(10, 10, 100, 100);
        assert_relative_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn test_iou_partial_overlap() {
        let a = BoundingBox::new(0, 0, 100, 100);
        let b = BoundingBox::new(50, 0, 100, 100);
        assert_relative_eq!(a.iou(&b), 5000.0 / 15000.0);
    }

    #[test]
    fn test_iou_touching_edges() {
        let a = BoundingBox::new(0, 0, 50, 50);
        let b = BoundingBox::new(50, 0, 50, 50);
        assert_relative_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_fraction_truncates() {
        let b = BoundingBox::new(0, 0, 10, 10);
        let f = b.fraction((0.1, 0.35), (0.25, 0.75));
        assert_eq!(f, BoundingBox::new(2, 1, 5, 2));
    }

    #[test]
    fn test_scaled() {
        let b = BoundingBox::new(10, 20, 30, 40).scaled(2.0);
        assert_eq!(b, BoundingBox::new(20, 40, 60, 80));
    }
}
