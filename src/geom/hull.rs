//! Convex hulls on the horizontal plane and in vertical cut planes.

use crate::Point;
use crate::geom::EPS;

fn cross(o: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

/// Convex hull of the horizontal projections (Andrew's monotone chain).
///
/// Returns the hull vertices in counter-clockwise order without repeating the
/// first vertex. Collinear points on hull edges are dropped.
pub fn convex_hull(pts: &[Point]) -> Vec<Point> {
    let mut sorted: Vec<Point> = pts.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    sorted.dedup_by(|a, b| a.is_close_2d(b));
    if sorted.len() < 3 {
        return sorted;
    }

    let xy = |p: &Point| (p.x, p.y);
    let mut lower: Vec<Point> = Vec::new();
    for p in &sorted {
        while lower.len() >= 2
            && cross(xy(&lower[lower.len() - 2]), xy(&lower[lower.len() - 1]), xy(p)) <= EPS
        {
            lower.pop();
        }
        lower.push(*p);
    }
    let mut upper: Vec<Point> = Vec::new();
    for p in sorted.iter().rev() {
        while upper.len() >= 2
            && cross(xy(&upper[upper.len() - 2]), xy(&upper[upper.len() - 1]), xy(p)) <= EPS
        {
            upper.pop();
        }
        upper.push(*p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Upper convex chain of `(abscissa, height)` pairs, from the smallest to the
/// largest abscissa.
///
/// This is the taut string stretched over all points: the shortest path from
/// the first to the last point that stays above every point.
/// Returns indices into `pts`.
pub fn upper_chain(pts: &[(f64, f64)]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..pts.len()).collect();
    order.sort_by(|&a, &b| pts[a].0.total_cmp(&pts[b].0).then(pts[b].1.total_cmp(&pts[a].1)));
    let mut chain: Vec<usize> = Vec::new();
    for &i in &order {
        while chain.len() >= 2
            && cross(pts[chain[chain.len() - 2]], pts[chain[chain.len() - 1]], pts[i]) >= -EPS
        {
            chain.pop();
        }
        if let Some(&last) = chain.last()
            && (pts[last].0 - pts[i].0).abs() < EPS
        {
            // Same abscissa: the higher point was sorted first
            continue;
        }
        chain.push(i);
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convex_hull_square_with_inner_point() {
        let pts = vec![
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(1.0, 1.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
            Point::new(0.5, 0.5, 0.0),
            Point::new(0.5, 0.0, 0.0),
        ];
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4);
        assert!(hull[0].is_close(&Point::new(0.0, 0.0, 0.0)));
        assert!(hull[1].is_close(&Point::new(1.0, 0.0, 0.0)));
        assert!(hull[2].is_close(&Point::new(1.0, 1.0, 0.0)));
    }

    #[test]
    fn test_upper_chain_over_barrier() {
        // Source, two roof corners, receiver
        let pts = vec![(0.0, 1.0), (10.0, 8.0), (16.0, 8.0), (30.0, 4.0), (20.0, 2.0)];
        let chain = upper_chain(&pts);
        assert_eq!(chain, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_upper_chain_no_obstacle() {
        let pts = vec![(0.0, 1.0), (50.0, 4.0), (20.0, 0.0)];
        let chain = upper_chain(&pts);
        assert_eq!(chain, vec![0, 1]);
    }
}
