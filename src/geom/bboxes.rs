use crate::geom::EPS;
use crate::geom::point::Point;

/// Axis-aligned bounding rectangle of horizontal projections.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox2 {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BBox2 {
    /// Bounding rectangle of all points. Returns `None` for an empty slice.
    pub fn from_points(pts: &[Point]) -> Option<Self> {
        let first = pts.first()?;
        let mut bbox = Self {
            xmin: first.x,
            ymin: first.y,
            xmax: first.x,
            ymax: first.y,
        };
        for p in pts.iter().skip(1) {
            bbox.expand(p);
        }
        Some(bbox)
    }

    pub fn from_segment(p1: Point, p2: Point) -> Self {
        Self {
            xmin: p1.x.min(p2.x),
            ymin: p1.y.min(p2.y),
            xmax: p1.x.max(p2.x),
            ymax: p1.y.max(p2.y),
        }
    }

    pub fn expand(&mut self, p: &Point) {
        self.xmin = self.xmin.min(p.x);
        self.ymin = self.ymin.min(p.y);
        self.xmax = self.xmax.max(p.x);
        self.ymax = self.ymax.max(p.y);
    }

    /// Returns a copy grown by `margin` on every side.
    pub fn inflate(&self, margin: f64) -> Self {
        Self {
            xmin: self.xmin - margin,
            ymin: self.ymin - margin,
            xmax: self.xmax + margin,
            ymax: self.ymax + margin,
        }
    }

    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.xmin - EPS
            && p.x <= self.xmax + EPS
            && p.y >= self.ymin - EPS
            && p.y <= self.ymax + EPS
    }

    /// Checks whether two rectangles overlap (touching counts).
    pub fn overlaps(&self, other: &Self) -> bool {
        !(self.xmax < other.xmin - EPS
            || self.xmin > other.xmax + EPS
            || self.ymax < other.ymin - EPS
            || self.ymin > other.ymax + EPS)
    }

    /// Shortest planar distance from a point to the rectangle (0 inside).
    pub fn distance_to(&self, p: &Point) -> f64 {
        let dx = (self.xmin - p.x).max(0.0).max(p.x - self.xmax);
        let dy = (self.ymin - p.y).max(0.0).max(p.y - self.ymax);
        dx.hypot(dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points() {
        let pts = vec![
            Point::new(1.0, 5.0, 0.0),
            Point::new(-2.0, 3.0, 0.0),
            Point::new(4.0, -1.0, 0.0),
        ];
        let bbox = BBox2::from_points(&pts).unwrap();
        assert_eq!(bbox.xmin, -2.0);
        assert_eq!(bbox.ymin, -1.0);
        assert_eq!(bbox.xmax, 4.0);
        assert_eq!(bbox.ymax, 5.0);
        assert!(BBox2::from_points(&[]).is_none());
    }

    #[test]
    fn test_overlaps() {
        let a = BBox2::from_segment(Point::new(0.0, 0.0, 0.0), Point::new(1.0, 1.0, 0.0));
        let b = BBox2::from_segment(Point::new(1.0, 1.0, 0.0), Point::new(2.0, 2.0, 0.0));
        let c = BBox2::from_segment(Point::new(3.0, 3.0, 0.0), Point::new(4.0, 4.0, 0.0));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_distance_to() {
        let a = BBox2::from_segment(Point::new(0.0, 0.0, 0.0), Point::new(1.0, 1.0, 0.0));
        assert_eq!(a.distance_to(&Point::new(0.5, 0.5, 0.0)), 0.0);
        assert!((a.distance_to(&Point::new(4.0, 5.0, 0.0)) - 5.0).abs() < 1e-12);
    }
}
