//! Axis-aligned bounding rectangles in PDF page space (y grows downward).

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle `(x0, y0, x1, y1)` with `x0 <= x1`, `y0 <= y1`.
///
/// Coordinates are rounded to two decimals on construction to absorb
/// renderer tolerance, per the spec's numeric semantics for PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    /// builds a bbox from two opposing corners, normalizing order and
    /// rounding to two decimal places.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        let (x0, x1) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
        let (y0, y1) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        BBox {
            x0: round2(x0),
            y0: round2(y0),
            x1: round2(x1),
            y1: round2(y1),
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.x0 <= x && x <= self.x1 && self.y0 <= y && y <= self.y1
    }

    /// the minimum bbox containing both `a` and `b`.
    pub fn merge(a: BBox, b: BBox) -> BBox {
        BBox::new(a.x0.min(b.x0), a.y0.min(b.y0), a.x1.max(b.x1), a.y1.max(b.y1))
    }

    /// merges a non-empty slice of bboxes, panicking on an empty slice –
    /// callers (table/discovery code) always guard on non-emptiness first.
    pub fn merge_all(bboxes: &[BBox]) -> BBox {
        let mut iter = bboxes.iter().copied();
        let first = iter.next().expect("merge_all requires at least one bbox");
        iter.fold(first, BBox::merge)
    }

    /// absolute length of x-axis intersection ("v-overlap": rectangles
    /// share vertical extent).
    pub fn v_overlap(a: BBox, b: BBox) -> f64 {
        (a.x1.min(b.x1) - a.x0.max(b.x0)).max(0.0)
    }

    /// absolute length of y-axis intersection ("h-overlap": rectangles
    /// share horizontal extent).
    pub fn h_overlap(a: BBox, b: BBox) -> f64 {
        (a.y1.min(b.y1) - a.y0.max(b.y0)).max(0.0)
    }

    /// true iff the v-overlap covers at least `frac` of the narrower
    /// rectangle's width. `frac = 1.0` requires total coverage of the
    /// narrower rectangle.
    pub fn is_v_overlap(a: BBox, b: BBox, frac: f64) -> bool {
        let narrow = a.width().min(b.width());
        if narrow <= 0.0 {
            return false;
        }
        BBox::v_overlap(a, b) >= frac * narrow
    }

    /// true iff the h-overlap covers at least `frac` of the shorter
    /// rectangle's height.
    pub fn is_h_overlap(a: BBox, b: BBox, frac: f64) -> bool {
        let narrow = a.height().min(b.height());
        if narrow <= 0.0 {
            return false;
        }
        BBox::h_overlap(a, b) >= frac * narrow
    }

    /// true iff the horizontal gap between `a` and `b` is smaller than
    /// `threshold` (typically the mean glyph advance width).
    pub fn is_next_to(a: BBox, b: BBox, threshold: f64) -> bool {
        let gap = if a.x1 <= b.x0 {
            b.x0 - a.x1
        } else if b.x1 <= a.x0 {
            a.x0 - b.x1
        } else {
            return true;
        };
        gap < threshold
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x0: f64, y0: f64, x1: f64, y1: f64) -> BBox {
        BBox::new(x0, y0, x1, y1)
    }

    #[test]
    fn rounds_to_two_decimals() {
        let b = bbox(1.23456, 0.0, 2.0, 1.0);
        assert_eq!(b.x0, 1.23);
    }

    #[test]
    fn normalizes_corner_order() {
        let b = bbox(5.0, 5.0, 1.0, 1.0);
        assert_eq!((b.x0, b.y0, b.x1, b.y1), (1.0, 1.0, 5.0, 5.0));
    }

    #[test]
    fn merge_is_minimal_bounding_box() {
        let a = bbox(0.0, 0.0, 2.0, 2.0);
        let b = bbox(1.0, 1.0, 3.0, 4.0);
        let m = BBox::merge(a, b);
        assert_eq!((m.x0, m.y0, m.x1, m.y1), (0.0, 0.0, 3.0, 4.0));
    }

    #[test]
    fn v_overlap_requires_full_coverage_at_frac_one() {
        let narrow = bbox(1.0, 0.0, 2.0, 1.0);
        let wide = bbox(0.0, 0.0, 3.0, 1.0);
        assert!(BBox::is_v_overlap(narrow, wide, 1.0));
        let partial = bbox(1.5, 0.0, 4.0, 1.0);
        assert!(!BBox::is_v_overlap(narrow, partial, 1.0));
    }

    #[test]
    fn h_overlap_fraction_of_shorter_side() {
        let a = bbox(0.0, 0.0, 1.0, 10.0);
        let b = bbox(0.0, 5.0, 1.0, 10.0);
        // overlap is 5 units, shorter height is 5 (b), so frac == 1.0
        assert!(BBox::is_h_overlap(a, b, 1.0));
    }

    #[test]
    fn is_next_to_uses_gap_not_overlap() {
        let a = bbox(0.0, 0.0, 1.0, 1.0);
        let b = bbox(1.2, 0.0, 2.0, 1.0);
        assert!(BBox::is_next_to(a, b, 0.3));
        assert!(!BBox::is_next_to(a, b, 0.1));
    }

    #[test]
    fn is_next_to_true_when_overlapping() {
        let a = bbox(0.0, 0.0, 2.0, 1.0);
        let b = bbox(1.0, 0.0, 3.0, 1.0);
        assert!(BBox::is_next_to(a, b, 0.0));
    }
}
