use anyhow::Result;

use crate::Point;
use crate::error::NoiseError;
use crate::geom::EPS;
use crate::geom::bboxes::BBox2;
use crate::geom::segment::{SegmentIntersection, segment_intersection};

/// Planar polygon with optional holes.
///
/// Only the horizontal projection of the vertices is used. Rings are stored
/// without the closing vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    outer: Vec<Point>,
    holes: Vec<Vec<Point>>,
    bbox: BBox2,
}

impl Polygon {
    /// Creates a polygon from an outer ring and holes.
    ///
    /// Fails if a ring has fewer than 3 distinct vertices, a coordinate is not
    /// finite, or the outer ring has no area.
    pub fn new(outer: Vec<Point>, holes: Vec<Vec<Point>>) -> Result<Self> {
        let outer = clean_ring(outer, "outer ring")?;
        let holes = holes
            .into_iter()
            .enumerate()
            .map(|(i, h)| clean_ring(h, &format!("hole {}", i)))
            .collect::<Result<Vec<_>>>()?;
        if ring_area(&outer).abs() < EPS {
            return Err(NoiseError::Validation("polygon outer ring has zero area".to_string()).into());
        }
        let bbox = BBox2::from_points(&outer).ok_or_else(|| {
            NoiseError::Validation("polygon outer ring is empty".to_string())
        })?;
        Ok(Self { outer, holes, bbox })
    }

    /// Axis-aligned rectangle given by two opposite corners.
    pub fn rectangle(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Result<Self> {
        Self::new(
            vec![
                Point::new(xmin, ymin, 0.0),
                Point::new(xmax, ymin, 0.0),
                Point::new(xmax, ymax, 0.0),
                Point::new(xmin, ymax, 0.0),
            ],
            vec![],
        )
    }

    pub fn outer(&self) -> &[Point] {
        &self.outer
    }

    pub fn holes(&self) -> &[Vec<Point>] {
        &self.holes
    }

    pub fn bbox(&self) -> BBox2 {
        self.bbox
    }

    /// All rings, outer ring first.
    pub fn rings(&self) -> impl Iterator<Item = &[Point]> {
        std::iter::once(self.outer.as_slice()).chain(self.holes.iter().map(|h| h.as_slice()))
    }

    /// All vertices of all rings.
    pub fn vertices(&self) -> impl Iterator<Item = &Point> {
        self.rings().flat_map(|r| r.iter())
    }

    /// All edges of all rings, in ring order.
    pub fn edges(&self) -> Vec<(Point, Point)> {
        let mut edges = Vec::new();
        for ring in self.rings() {
            let n = ring.len();
            for i in 0..n {
                edges.push((ring[i], ring[(i + 1) % n]));
            }
        }
        edges
    }

    /// Area of the outer ring minus the holes.
    pub fn area(&self) -> f64 {
        let holes: f64 = self.holes.iter().map(|h| ring_area(h).abs()).sum();
        ring_area(&self.outer).abs() - holes
    }

    /// Even-odd point-in-polygon test on the horizontal projection.
    ///
    /// Points exactly on an edge may be reported either way.
    pub fn contains(&self, p: &Point) -> bool {
        if !self.bbox.contains(p) {
            return false;
        }
        let mut inside = false;
        for ring in self.rings() {
            let n = ring.len();
            let mut j = n - 1;
            for i in 0..n {
                let (pi, pj) = (ring[i], ring[j]);
                if (pi.y > p.y) != (pj.y > p.y) {
                    let x_cross = pj.x + (p.y - pj.y) / (pi.y - pj.y) * (pi.x - pj.x);
                    if p.x < x_cross {
                        inside = !inside;
                    }
                }
                j = i;
            }
        }
        inside
    }

    /// Relative positions along p1->p2 where the segment crosses the polygon boundary.
    ///
    /// The returned values are sorted and deduplicated.
    pub fn boundary_crossings(&self, p1: Point, p2: Point) -> Vec<f64> {
        if !self.bbox.overlaps(&BBox2::from_segment(p1, p2)) {
            return Vec::new();
        }
        let mut ts = Vec::new();
        for (a, b) in self.edges() {
            match segment_intersection(p1, p2, a, b) {
                SegmentIntersection::Point { t, .. } => ts.push(t),
                SegmentIntersection::Collinear { t0, t1 } => {
                    ts.push(t0);
                    ts.push(t1);
                }
                SegmentIntersection::None => {}
            }
        }
        ts.sort_by(f64::total_cmp);
        ts.dedup_by(|a, b| (*a - *b).abs() < EPS);
        ts
    }
}

/// Removes the closing vertex and consecutive duplicates, then validates the ring.
fn clean_ring(mut ring: Vec<Point>, label: &str) -> Result<Vec<Point>> {
    if ring.iter().any(|p| !p.is_finite()) {
        return Err(NoiseError::Validation(format!("{} has non-finite coordinates", label)).into());
    }
    ring.dedup_by(|a, b| a.is_close_2d(b));
    if ring.len() > 1 && ring[0].is_close_2d(&ring[ring.len() - 1]) {
        ring.pop();
    }
    if ring.len() < 3 {
        return Err(NoiseError::Validation(format!(
            "{} needs at least 3 vertices, got {}",
            label,
            ring.len()
        ))
        .into());
    }
    Ok(ring)
}

/// Signed area (shoelace formula), positive for counter-clockwise rings.
pub fn ring_area(ring: &[Point]) -> f64 {
    let n = ring.len();
    let mut sum = 0.0;
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    0.5 * sum
}
