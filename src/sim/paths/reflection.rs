//! Specular facade reflections with the image source method.

use std::collections::BTreeSet;

use anyhow::Result;

use crate::Point;
use crate::geom::EPS;
use crate::geom::segment::{
    SegmentIntersection, mirror_across_line, segment_intersection, side_of_line,
};
use crate::sim::profile::{Profile, Wall};

use super::{
    PathEvent, PathKind, PathOptions, PropagationPath, ground_along, interpolate_z, polyline_length,
};

/// Step off a facade used to tell which side lies outside its building.
const SIDE_STEP: f64 = 1e-3;

/// Reflected paths by increasing order, then by facade sequence.
pub(crate) fn reflection_paths(
    source: Point,
    receiver: Point,
    profile: &Profile,
    options: &PathOptions,
) -> Result<Vec<PropagationPath>> {
    if options.max_reflection_order == 0 {
        return Ok(Vec::new());
    }
    let walls = profile.walls();
    let mut candidates: BTreeSet<usize> = BTreeSet::new();
    candidates.extend(profile.walls_near(&source, options.max_reflection_distance)?);
    candidates.extend(profile.walls_near(&receiver, options.max_reflection_distance)?);
    let candidates: Vec<usize> = candidates
        .into_iter()
        .filter(|&w| walls[w].absorption < 1.0)
        .collect();

    let direct_length = source.distance(&receiver);
    let mut paths = Vec::new();
    for order in 1..=options.max_reflection_order {
        let mut sequence = Vec::with_capacity(order);
        let mut images = vec![source];
        visit(
            order,
            &candidates,
            &mut sequence,
            &mut images,
            &mut |sequence: &[usize], images: &[Point]| -> Result<()> {
                if let Some(points) = unfold(sequence, images, receiver, profile)? {
                    let ground = ground_along(&points, profile, options.source_ground_factor)?;
                    let mut events = vec![PathEvent::Source(source)];
                    for (k, &w) in sequence.iter().enumerate() {
                        events.push(PathEvent::Reflection {
                            point: points[k + 1],
                            wall: w,
                            absorption: walls[w].absorption,
                        });
                    }
                    events.push(PathEvent::Receiver(receiver));
                    paths.push(PropagationPath {
                        kind: PathKind::Reflection { order },
                        events,
                        length: polyline_length(&points),
                        direct_length,
                        diffraction: None,
                        ground,
                    });
                }
                Ok(())
            },
            profile,
        )?;
    }
    Ok(paths)
}

/// Depth-first enumeration of facade sequences of length `order`, in
/// lexicographic order of facade indices. `images[k]` is the source mirrored
/// on the first `k` facades.
fn visit(
    order: usize,
    candidates: &[usize],
    sequence: &mut Vec<usize>,
    images: &mut Vec<Point>,
    emit: &mut dyn FnMut(&[usize], &[Point]) -> Result<()>,
    profile: &Profile,
) -> Result<()> {
    if sequence.len() == order {
        return emit(sequence, images);
    }
    let walls = profile.walls();
    for &w in candidates {
        if sequence.last() == Some(&w) {
            continue;
        }
        let wall = &walls[w];
        let Some(&image) = images.last() else {
            continue;
        };
        if !faces_exterior(wall, image, profile) {
            continue;
        }
        let Some(next) = mirror_across_line(image, wall.p0, wall.p1) else {
            continue;
        };
        sequence.push(w);
        images.push(next);
        visit(order, candidates, sequence, images, emit, profile)?;
        sequence.pop();
        images.pop();
    }
    Ok(())
}

/// True if `p` lies on the outer side of the facade.
fn faces_exterior(wall: &Wall, p: Point, profile: &Profile) -> bool {
    let side = side_of_line(wall.p0, wall.p1, p);
    if side.abs() < EPS {
        return false;
    }
    let mid = Point::lerp(wall.p0, wall.p1, 0.5);
    let (dx, dy) = (wall.p1.x - wall.p0.x, wall.p1.y - wall.p0.y);
    let len = dx.hypot(dy);
    // Left normal of p0->p1, flipped towards p
    let sign = side.signum();
    let beside = Point::new(
        mid.x - sign * dy / len * SIDE_STEP,
        mid.y + sign * dx / len * SIDE_STEP,
        mid.z,
    );
    !profile.buildings()[wall.building]
        .footprint()
        .contains(&beside)
}

/// Reflection points of a facade sequence, walking back from the receiver
/// towards the images. Returns the full polyline source, reflections,
/// receiver, or `None` if the reflections fall outside the facades, above
/// the roofs, or if a leg is blocked.
fn unfold(
    sequence: &[usize],
    images: &[Point],
    receiver: Point,
    profile: &Profile,
) -> Result<Option<Vec<Point>>> {
    let walls = profile.walls();
    let mut reflections = vec![Point::new(0.0, 0.0, 0.0); sequence.len()];
    let mut target = receiver;
    for k in (0..sequence.len()).rev() {
        let wall = &walls[sequence[k]];
        match segment_intersection(target, images[k + 1], wall.p0, wall.p1) {
            SegmentIntersection::Point { t, .. } if t > EPS && t < 1.0 - EPS => {
                let p = Point::lerp(target, images[k + 1], t);
                reflections[k] = p;
                target = p;
            }
            _ => return Ok(None),
        }
    }

    let mut points = Vec::with_capacity(sequence.len() + 2);
    points.push(images[0]);
    points.extend(reflections);
    points.push(receiver);
    interpolate_z(&mut points);

    for (k, &w) in sequence.iter().enumerate() {
        let roof_z = profile.buildings()[walls[w].building].roof_z();
        if points[k + 1].z >= roof_z {
            return Ok(None);
        }
    }
    for leg in points.windows(2) {
        if profile.is_obstructed(leg[0], leg[1])? {
            return Ok(None);
        }
    }
    Ok(Some(points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Polygon;
    use crate::sim::profile::Height;

    fn wall_profile() -> Profile {
        let mut profile = Profile::new();
        // Long thin building with its south facade along y = 10
        profile
            .add_building(
                Polygon::rectangle(-50.0, 10.0, 50.0, 12.0).unwrap(),
                Height::Relative(10.0),
                Some(0.2),
            )
            .unwrap();
        profile.finish_building();
        profile
    }

    #[test]
    fn test_first_order_reflection() {
        let profile = wall_profile();
        let options = PathOptions {
            max_reflection_order: 1,
            ..PathOptions::new()
        };
        let s = Point::new(-10.0, 0.0, 1.0);
        let r = Point::new(10.0, 0.0, 1.0);
        let paths = reflection_paths(s, r, &profile, &options).unwrap();
        assert_eq!(paths.len(), 1);
        let path = &paths[0];
        assert_eq!(path.kind, PathKind::Reflection { order: 1 });
        let p = path.events[1].position();
        assert!(p.x.abs() < 1e-9 && (p.y - 10.0).abs() < 1e-9);
        assert!((path.length - 2.0 * 200f64.sqrt()).abs() < 1e-9);
        assert_eq!(path.reflection_absorptions().collect::<Vec<_>>(), vec![0.2]);
    }

    #[test]
    fn test_no_reflection_above_roof_or_disabled() {
        let profile = wall_profile();
        let s = Point::new(-10.0, 0.0, 30.0);
        let r = Point::new(10.0, 0.0, 30.0);
        let options = PathOptions {
            max_reflection_order: 1,
            ..PathOptions::new()
        };
        assert!(reflection_paths(s, r, &profile, &options).unwrap().is_empty());
        let s = Point::new(-10.0, 0.0, 1.0);
        let r = Point::new(10.0, 0.0, 1.0);
        assert!(
            reflection_paths(s, r, &profile, &PathOptions::new())
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_street_canyon_second_order() {
        let mut profile = Profile::new();
        profile
            .add_building(
                Polygon::rectangle(-50.0, 10.0, 50.0, 12.0).unwrap(),
                Height::Relative(10.0),
                None,
            )
            .unwrap();
        profile
            .add_building(
                Polygon::rectangle(-50.0, -12.0, 50.0, -10.0).unwrap(),
                Height::Relative(10.0),
                None,
            )
            .unwrap();
        profile.finish_building();
        let options = PathOptions {
            max_reflection_order: 2,
            ..PathOptions::new()
        };
        let s = Point::new(-10.0, 0.0, 1.0);
        let r = Point::new(10.0, 2.0, 1.5);
        let paths = reflection_paths(s, r, &profile, &options).unwrap();
        let first = paths
            .iter()
            .filter(|p| p.kind == PathKind::Reflection { order: 1 })
            .count();
        let second = paths
            .iter()
            .filter(|p| p.kind == PathKind::Reflection { order: 2 })
            .count();
        assert_eq!(first, 2);
        assert_eq!(second, 2);
        // Grouped by increasing order
        assert!(paths[..2].iter().all(|p| p.kind == PathKind::Reflection { order: 1 }));
        for p in &paths {
            assert!(p.length > p.direct_length);
        }
    }
}
