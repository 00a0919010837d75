//! Planar Delaunay triangulation via the Bowyer-Watson incremental insertion algorithm.
//!
//! Used to build the terrain surface from topographic vertices. Only `x` and
//! `y` take part in the triangulation; `z` is carried along for interpolation.

use std::collections::BTreeMap;

use crate::Point;
use crate::geom::EPS;
use crate::geom::bboxes::BBox2;

/// Internal triangle representation with cached circumcircle data.
struct BwTri {
    v: [usize; 3],
    cx: f64,
    cy: f64,
    radius_sq: f64,
}

/// Circumcircle center and squared radius of a planar triangle.
///
/// Returns `None` for (nearly) collinear vertices.
fn circumcircle(a: Point, b: Point, c: Point) -> Option<(f64, f64, f64)> {
    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
    if d.abs() < EPS {
        return None;
    }
    let a2 = a.x * a.x + a.y * a.y;
    let b2 = b.x * b.x + b.y * b.y;
    let c2 = c.x * c.x + c.y * c.y;
    let ux = (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d;
    let uy = (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d;
    let r2 = (a.x - ux).powi(2) + (a.y - uy).powi(2);
    Some((ux, uy, r2))
}

/// Twice the signed area of a planar triangle.
pub fn triangle_area2(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)
}

/// Creates a super-triangle enclosing all given points.
fn super_triangle(points: &[Point]) -> Option<[Point; 3]> {
    let bbox = BBox2::from_points(points)?;
    let cx = (bbox.xmin + bbox.xmax) * 0.5;
    let cy = (bbox.ymin + bbox.ymax) * 0.5;
    let extent = (bbox.xmax - bbox.xmin).max(bbox.ymax - bbox.ymin).max(1.0);
    let scale = 50.0 * extent;
    Some([
        Point::new(cx - scale, cy - scale, 0.0),
        Point::new(cx + scale, cy - scale, 0.0),
        Point::new(cx, cy + scale, 0.0),
    ])
}

/// Bowyer-Watson incremental Delaunay triangulation.
///
/// Returns `None` if fewer than 3 points are provided or all points are collinear.
/// The returned triangles reference indices into `points` and are counter-clockwise.
/// The output is deterministic for a given input order.
pub fn bowyer_watson(points: &[Point]) -> Option<Vec<[usize; 3]>> {
    let n = points.len();
    if n < 3 {
        return None;
    }

    let super_pts = super_triangle(points)?;
    let mut all_points: Vec<Point> = points.to_vec();
    all_points.extend_from_slice(&super_pts);
    let si = [n, n + 1, n + 2];

    let (cx, cy, radius_sq) = circumcircle(all_points[si[0]], all_points[si[1]], all_points[si[2]])?;
    let mut tris: Vec<BwTri> = vec![BwTri {
        v: si,
        cx,
        cy,
        radius_sq,
    }];

    for i in 0..n {
        let pt = all_points[i];

        // Bad triangles: those whose circumcircle contains the new point
        let mut bad_indices: Vec<usize> = Vec::new();
        for (ti, tri) in tris.iter().enumerate() {
            let dist_sq = (tri.cx - pt.x).powi(2) + (tri.cy - pt.y).powi(2);
            if dist_sq < tri.radius_sq * (1.0 + 1e-12) {
                bad_indices.push(ti);
            }
        }
        if bad_indices.is_empty() {
            continue;
        }

        // Cavity boundary: edges shared by exactly one bad triangle
        let mut edge_count: BTreeMap<(usize, usize), (usize, [usize; 2])> = BTreeMap::new();
        for &bi in &bad_indices {
            let v = tris[bi].v;
            for (a, b) in [(v[0], v[1]), (v[1], v[2]), (v[2], v[0])] {
                let key = (a.min(b), a.max(b));
                edge_count
                    .entry(key)
                    .and_modify(|(count, _)| *count += 1)
                    .or_insert((1, [a, b]));
            }
        }
        let boundary_edges: Vec<[usize; 2]> = edge_count
            .into_values()
            .filter(|(count, _)| *count == 1)
            .map(|(_, edge)| edge)
            .collect();

        bad_indices.sort_unstable();
        for &bi in bad_indices.iter().rev() {
            tris.remove(bi);
        }

        for edge in &boundary_edges {
            let (a, b) = (edge[0], edge[1]);
            let (pa, pb) = (all_points[a], all_points[b]);
            // Keep counter-clockwise orientation
            let v = if triangle_area2(pa, pb, pt) > 0.0 {
                [a, b, i]
            } else {
                [b, a, i]
            };
            if let Some((cx, cy, radius_sq)) =
                circumcircle(all_points[v[0]], all_points[v[1]], all_points[v[2]])
            {
                tris.push(BwTri { v, cx, cy, radius_sq });
            }
        }
    }

    // Remove triangles referencing super-triangle vertices
    tris.retain(|t| t.v.iter().all(|&vi| vi < n));

    let result: Vec<[usize; 3]> = tris
        .into_iter()
        .filter(|t| {
            triangle_area2(all_points[t.v[0]], all_points[t.v[1]], all_points[t.v[2]]).abs() > EPS
        })
        .map(|t| t.v)
        .collect();

    if result.is_empty() { None } else { Some(result) }
}

/// Barycentric coordinates of `p` in triangle (a, b, c), or `None` if degenerate.
pub fn barycentric(p: Point, a: Point, b: Point, c: Point) -> Option<(f64, f64, f64)> {
    let area = triangle_area2(a, b, c);
    if area.abs() < EPS {
        return None;
    }
    let wa = triangle_area2(p, b, c) / area;
    let wb = triangle_area2(a, p, c) / area;
    let wc = 1.0 - wa - wb;
    Some((wa, wb, wc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_gives_two_triangles() {
        let pts = vec![
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 1.0),
            Point::new(1.0, 1.0, 2.0),
            Point::new(0.0, 1.0, 1.0),
        ];
        let tris = bowyer_watson(&pts).unwrap();
        assert_eq!(tris.len(), 2);
        let total: f64 = tris
            .iter()
            .map(|t| triangle_area2(pts[t[0]], pts[t[1]], pts[t[2]]) * 0.5)
            .sum();
        assert!((total - 1.0).abs() < 1e-9);
        for t in &tris {
            assert!(triangle_area2(pts[t[0]], pts[t[1]], pts[t[2]]) > 0.0);
        }
    }

    #[test]
    fn test_collinear_points() {
        let pts = vec![
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(2.0, 0.0, 0.0),
        ];
        assert!(bowyer_watson(&pts).is_none());
    }

    #[test]
    fn test_grid_covers_area() {
        let mut pts = Vec::new();
        for i in 0..5 {
            for j in 0..5 {
                pts.push(Point::new(i as f64 * 10.0, j as f64 * 10.0, 0.0));
            }
        }
        let tris = bowyer_watson(&pts).unwrap();
        let total: f64 = tris
            .iter()
            .map(|t| triangle_area2(pts[t[0]], pts[t[1]], pts[t[2]]).abs() * 0.5)
            .sum();
        assert!((total - 1600.0).abs() < 1e-6);
    }

    #[test]
    fn test_barycentric() {
        let a = Point::new(0.0, 0.0, 0.0);
        let b = Point::new(2.0, 0.0, 0.0);
        let c = Point::new(0.0, 2.0, 0.0);
        let (wa, wb, wc) = barycentric(Point::new(0.5, 0.5, 0.0), a, b, c).unwrap();
        assert!((wa - 0.5).abs() < 1e-12);
        assert!((wb - 0.25).abs() < 1e-12);
        assert!((wc - 0.25).abs() < 1e-12);
    }
}
