//! Horizontal detours around building footprints.

use std::collections::BTreeSet;

use anyhow::Result;

use crate::Point;
use crate::geom::hull::convex_hull;
use crate::sim::profile::Profile;

use super::interpolate_z;

/// Left and right detours from `source` to `receiver` around the obstructing
/// buildings, as planar polylines with interpolated elevations.
///
/// The detours follow the convex hull of both end points and all footprint
/// vertices of the obstacles. Buildings met by a detour are added to the
/// obstacle set until the hull no longer changes. Returns `None` for a side
/// when an end point is not on the hull.
pub(crate) fn lateral_detours(
    source: Point,
    receiver: Point,
    obstacles: &[usize],
    profile: &Profile,
) -> Result<(Option<Vec<Point>>, Option<Vec<Point>>)> {
    let mut included: BTreeSet<usize> = obstacles.iter().copied().collect();

    loop {
        let mut pts = vec![source, receiver];
        for &b in &included {
            pts.extend(profile.buildings()[b].footprint().outer().iter().copied());
        }
        let hull = convex_hull(&pts);
        let (Some(is), Some(ir)) = (
            hull.iter().position(|p| p.is_close_2d(&source)),
            hull.iter().position(|p| p.is_close_2d(&receiver)),
        ) else {
            return Ok((None, None));
        };

        let n = hull.len();
        // Counter-clockwise from the source keeps the obstacles on the left
        let mut right = vec![source];
        let mut i = (is + 1) % n;
        while i != ir {
            right.push(hull[i]);
            i = (i + 1) % n;
        }
        right.push(receiver);

        let mut left = vec![source];
        let mut i = (is + n - 1) % n;
        while i != ir {
            left.push(hull[i]);
            i = (i + n - 1) % n;
        }
        left.push(receiver);

        interpolate_z(&mut right);
        interpolate_z(&mut left);

        let mut grown = false;
        for path in [&left, &right] {
            for w in path.windows(2) {
                for b in profile.obstructing_buildings(w[0], w[1])? {
                    grown |= included.insert(b);
                }
            }
        }
        if !grown {
            let left = (left.len() > 2).then_some(left);
            let right = (right.len() > 2).then_some(right);
            return Ok((left, right));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Polygon;
    use crate::sim::profile::Height;

    #[test]
    fn test_detours_around_block() {
        let mut profile = Profile::new();
        profile
            .add_building(
                Polygon::rectangle(20.0, -10.0, 30.0, 10.0).unwrap(),
                Height::Relative(10.0),
                None,
            )
            .unwrap();
        profile.finish_building();

        let s = Point::new(0.0, 0.0, 1.0);
        let r = Point::new(50.0, 0.0, 1.0);
        let (left, right) = lateral_detours(s, r, &[0], &profile).unwrap();
        let left = left.unwrap();
        let right = right.unwrap();
        assert_eq!(left.len(), 4);
        assert_eq!(right.len(), 4);
        // Left of the direct line is +y when going along +x
        assert!(left[1..3].iter().all(|p| (p.y - 10.0).abs() < 1e-12));
        assert!(right[1..3].iter().all(|p| (p.y + 10.0).abs() < 1e-12));
        assert!(left.iter().all(|p| (p.z - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_detour_grows_with_neighbours() {
        let mut profile = Profile::new();
        profile
            .add_building(
                Polygon::rectangle(20.0, -10.0, 30.0, 10.0).unwrap(),
                Height::Relative(10.0),
                None,
            )
            .unwrap();
        // Blocks the first leg of the left detour only
        profile
            .add_building(
                Polygon::rectangle(8.0, 3.0, 12.0, 30.0).unwrap(),
                Height::Relative(10.0),
                None,
            )
            .unwrap();
        profile.finish_building();

        let s = Point::new(0.0, 0.0, 1.0);
        let r = Point::new(50.0, 0.0, 1.0);
        let (left, _) = lateral_detours(s, r, &[0], &profile).unwrap();
        let left = left.unwrap();
        assert_eq!(left.len(), 4);
        assert!(left[1..3].iter().all(|p| (p.y - 30.0).abs() < 1e-12));
    }
}
