//! Planar line segment operations.
//!
//! Propagation geometry works on the horizontal projection of points, so the
//! functions here ignore `z` unless stated otherwise.

use crate::Point;
use crate::geom::EPS;

/// Result of a planar segment intersection test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentIntersection {
    /// Segments cross at a single point.
    ///
    /// `t` and `s` are the relative positions along the first and second segment.
    Point { t: f64, s: f64 },
    /// Segments are collinear and overlap on `[t0, t1]` of the first segment.
    Collinear { t0: f64, t1: f64 },
    /// No intersection.
    None,
}

/// Finds the intersection of two segments projected on the horizontal plane.
pub fn segment_intersection(p1: Point, p2: Point, p3: Point, p4: Point) -> SegmentIntersection {
    let d1 = p2 - p1;
    let d2 = p4 - p3;
    let r = p3 - p1;

    let denom = d1.cross_2d(&d2);
    let d1_len_sq = d1.dot_2d(&d1);

    if denom.abs() < EPS * d1_len_sq.max(1.0) {
        // Parallel: collinear if p3 lies on the supporting line of p1-p2
        if r.cross_2d(&d1).abs() > EPS * d1_len_sq.sqrt().max(1.0) || d1_len_sq < EPS * EPS {
            return SegmentIntersection::None;
        }
        let t3 = r.dot_2d(&d1) / d1_len_sq;
        let t4 = (p4 - p1).dot_2d(&d1) / d1_len_sq;
        let t0 = t3.min(t4).max(0.0);
        let t1 = t3.max(t4).min(1.0);
        if t0 > t1 + EPS {
            return SegmentIntersection::None;
        }
        return SegmentIntersection::Collinear { t0, t1 };
    }

    let t = r.cross_2d(&d2) / denom;
    let s = r.cross_2d(&d1) / denom;

    if (-EPS..=1.0 + EPS).contains(&t) && (-EPS..=1.0 + EPS).contains(&s) {
        SegmentIntersection::Point {
            t: t.clamp(0.0, 1.0),
            s: s.clamp(0.0, 1.0),
        }
    } else {
        SegmentIntersection::None
    }
}

/// Signed area test: positive if `p` lies to the left of the directed line a->b.
pub fn side_of_line(a: Point, b: Point, p: Point) -> f64 {
    (b - a).cross_2d(&(p - a))
}

/// Shortest planar distance between a point and a segment.
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.dot_2d(&ab);
    if len_sq < EPS * EPS {
        return p.distance_2d(&a);
    }
    let t = ((p - a).dot_2d(&ab) / len_sq).clamp(0.0, 1.0);
    let proj = Point::lerp(a, b, t);
    p.distance_2d(&proj)
}

/// Mirrors `p` across the vertical plane holding the line a-b. Elevation is kept.
pub fn mirror_across_line(p: Point, a: Point, b: Point) -> Option<Point> {
    let ab = b - a;
    let len_sq = ab.dot_2d(&ab);
    if len_sq < EPS * EPS {
        return None;
    }
    let t = (p - a).dot_2d(&ab) / len_sq;
    let fx = a.x + t * ab.dx;
    let fy = a.y + t * ab.dy;
    Some(Point::new(2.0 * fx - p.x, 2.0 * fy - p.y, p.z))
}
