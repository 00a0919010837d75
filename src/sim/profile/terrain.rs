use crate::Point;
use crate::geom::EPS;
use crate::geom::bboxes::BBox2;
use crate::geom::delaunay::{barycentric, bowyer_watson};
use crate::geom::segment::{SegmentIntersection, segment_intersection};

use super::index::GridIndex;

/// Triangulated terrain surface built from topographic vertices.
#[derive(Debug, Clone)]
pub struct Terrain {
    vertices: Vec<Point>,
    triangles: Vec<[usize; 3]>,
    index: GridIndex,
}

impl Terrain {
    /// Triangulates the given vertices.
    ///
    /// Duplicate planar positions keep the first elevation. Returns `None`
    /// if the vertices do not span an area.
    pub fn new(mut vertices: Vec<Point>) -> Option<Self> {
        vertices.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
        vertices.dedup_by(|a, b| a.is_close_2d(b));
        let triangles = bowyer_watson(&vertices)?;
        let bboxes: Vec<BBox2> = triangles
            .iter()
            .filter_map(|t| BBox2::from_points(&[vertices[t[0]], vertices[t[1]], vertices[t[2]]]))
            .collect();
        let index = GridIndex::new(&bboxes);
        Some(Self {
            vertices,
            triangles,
            index,
        })
    }

    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    fn corners(&self, tri: usize) -> [Point; 3] {
        let t = self.triangles[tri];
        [self.vertices[t[0]], self.vertices[t[1]], self.vertices[t[2]]]
    }

    /// Interpolated elevation, or `None` outside the triangulation.
    pub fn elevation_at(&self, x: f64, y: f64) -> Option<f64> {
        let p = Point::new(x, y, 0.0);
        for &tri in self.index.find_at(&p) {
            let [a, b, c] = self.corners(tri);
            if let Some((wa, wb, wc)) = barycentric(p, a, b, c)
                && wa >= -EPS
                && wb >= -EPS
                && wc >= -EPS
            {
                return Some(wa * a.z + wb * b.z + wc * c.z);
            }
        }
        None
    }

    /// Relative positions along p1-p2 where the segment crosses triangle edges,
    /// with the terrain elevation there.
    pub fn edge_crossings(&self, p1: Point, p2: Point) -> Vec<(f64, f64)> {
        let mut samples: Vec<(f64, f64)> = Vec::new();
        for tri in self.index.find_along_segment(&p1, &p2) {
            let corners = self.corners(tri);
            for k in 0..3 {
                let (a, b) = (corners[k], corners[(k + 1) % 3]);
                match segment_intersection(p1, p2, a, b) {
                    SegmentIntersection::Point { t, s } => {
                        samples.push((t, a.z + s * (b.z - a.z)));
                    }
                    SegmentIntersection::Collinear { t0, t1 } => {
                        for t in [t0, t1] {
                            let q = Point::lerp(p1, p2, t);
                            let len = a.distance_2d(&b);
                            let s = if len > EPS { a.distance_2d(&q) / len } else { 0.0 };
                            samples.push((t, a.z + s * (b.z - a.z)));
                        }
                    }
                    SegmentIntersection::None => {}
                }
            }
        }
        samples.sort_by(|a, b| a.0.total_cmp(&b.0));
        samples.dedup_by(|a, b| (a.0 - b.0).abs() < EPS);
        samples
    }
}
