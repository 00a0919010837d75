use anyhow::Result;
use tracing::trace;

use crate::Point;
use crate::error::{NoiseError, check_unit_interval};
use crate::geom::EPS;
use crate::geom::hull::upper_chain;
use crate::sim::profile::{CutKind, Profile, VerticalProfile};

use super::lateral::lateral_detours;
use super::reflection::reflection_paths;
use super::{
    DiffractionGeometry, GroundGeometry, PathEvent, PathKind, PathOptions, PropagationPath,
    ground_along, polyline_length,
};

/// Finds the propagation paths between a source and a receiver.
///
/// Paths come in a fixed order: direct, top diffraction, left then right
/// lateral diffraction, then reflections by increasing order.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathFinder {
    options: PathOptions,
}

impl PathFinder {
    pub fn new(options: PathOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PathOptions {
        &self.options
    }

    pub fn find_paths(
        &self,
        source: Point,
        receiver: Point,
        profile: &Profile,
    ) -> Result<Vec<PropagationPath>> {
        if !source.is_finite() || !receiver.is_finite() {
            return Err(NoiseError::Validation(
                "source and receiver coordinates must be finite".to_string(),
            )
            .into());
        }
        if source.distance(&receiver) < EPS {
            return Err(NoiseError::Validation(
                "source and receiver are at the same position".to_string(),
            )
            .into());
        }
        if let Some(gs) = self.options.source_ground_factor {
            check_unit_interval(gs, "source ground factor")?;
        }

        let cut = profile.vertical_profile(source, receiver)?;
        let obstacles = profile.obstructing_buildings(source, receiver)?;
        let direct_length = source.distance(&receiver);
        let ground = ground_along(&[source, receiver], profile, self.options.source_ground_factor)?;

        let mut paths = vec![PropagationPath {
            kind: PathKind::Direct,
            events: vec![PathEvent::Source(source), PathEvent::Receiver(receiver)],
            length: direct_length,
            direct_length,
            diffraction: screening(&cut, direct_length),
            ground: ground.clone(),
        }];

        let terrain_blocks = cut.terrain_above_line().next().is_some();
        if !obstacles.is_empty() || terrain_blocks {
            if self.options.vertical_diffraction
                && let Some(path) = top_path(&cut, direct_length, &ground)
            {
                paths.push(path);
            }
            // Nothing to go around when only the terrain is in the way
            if self.options.horizontal_diffraction && !obstacles.is_empty() {
                let (left, right) = lateral_detours(source, receiver, &obstacles, profile)?;
                for (kind, detour) in [(PathKind::LateralLeft, left), (PathKind::LateralRight, right)]
                {
                    if let Some(points) = detour {
                        paths.push(diffracted_path(
                            kind,
                            points,
                            direct_length,
                            self.options.source_ground_factor,
                            profile,
                        )?);
                    }
                }
            }
        }

        paths.extend(reflection_paths(source, receiver, profile, &self.options)?);
        trace!(paths = paths.len(), obstacles = obstacles.len(), "Paths found");
        Ok(paths)
    }
}

/// Path along a planar detour whose interior vertices are diffraction edges.
fn diffracted_path(
    kind: PathKind,
    points: Vec<Point>,
    direct_length: f64,
    source_ground_factor: Option<f64>,
    profile: &Profile,
) -> Result<PropagationPath> {
    let length = polyline_length(&points);
    let edges = &points[1..points.len() - 1];
    let ground = ground_along(&points, profile, source_ground_factor)?;
    let mut events = vec![PathEvent::Source(points[0])];
    events.extend(edges.iter().map(|p| PathEvent::Diffraction(*p)));
    events.push(PathEvent::Receiver(points[points.len() - 1]));
    // Rays only bend in the vertical plane
    let delta = length - direct_length;
    Ok(PropagationPath {
        kind,
        events,
        length,
        direct_length,
        diffraction: Some(DiffractionGeometry::new(delta, polyline_length(edges))),
        ground,
    })
}

/// Possible diffraction edges of the cut as `(distance, elevation)` pairs:
/// wall tops and terrain vertices between the two ends.
fn crests(cut: &VerticalProfile) -> Vec<(f64, f64)> {
    let length = cut.length();
    cut.points
        .iter()
        .filter_map(|p| match p.kind {
            CutKind::Wall { roof_z, .. } => Some((p.distance, roof_z)),
            CutKind::Topography if p.distance > EPS && p.distance < length - EPS => {
                Some((p.distance, p.position.z))
            }
            _ => None,
        })
        .collect()
}

/// Point of the cut at `distance` from its start, at elevation `z`.
fn cut_position(cut: &VerticalProfile, distance: f64, z: f64) -> Point {
    let length = cut.length();
    let t = if length > 0.0 { distance / length } else { 0.0 };
    Point::lerp(cut.p1, cut.p2, t).with_z(z)
}

/// Screening of the direct path by the single highest edge above the line of
/// sight, or `None` if nothing rises above it.
fn screening(cut: &VerticalProfile, direct_length: f64) -> Option<DiffractionGeometry> {
    crests(cut)
        .into_iter()
        .filter(|&(d, z)| z > cut.line_z_at(d) + EPS)
        .map(|(d, z)| {
            let edge = cut_position(cut, d, z);
            DiffractionGeometry::over_edges(&[cut.p1, edge, cut.p2], direct_length)
        })
        .max_by(|a, b| a.delta.total_cmp(&b.delta))
}

/// Shortest path over the roofs and the terrain in the vertical plane of the
/// direct line.
fn top_path(
    cut: &VerticalProfile,
    direct_length: f64,
    ground: &GroundGeometry,
) -> Option<PropagationPath> {
    let mut pts = vec![(0.0, cut.p1.z)];
    pts.extend(crests(cut));
    pts.push((cut.length(), cut.p2.z));

    let chain = upper_chain(&pts);
    if chain.len() < 3 {
        return None;
    }
    let polyline: Vec<Point> = chain
        .iter()
        .map(|&i| cut_position(cut, pts[i].0, pts[i].1))
        .collect();
    let edges = &polyline[1..polyline.len() - 1];

    let mut events = vec![PathEvent::Source(cut.p1)];
    events.extend(edges.iter().map(|p| PathEvent::Diffraction(*p)));
    events.push(PathEvent::Receiver(cut.p2));
    Some(PropagationPath {
        kind: PathKind::TopDiffraction,
        events,
        length: polyline_length(&polyline),
        direct_length,
        diffraction: Some(DiffractionGeometry::over_edges(&polyline, direct_length)),
        ground: ground.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Polygon;
    use crate::sim::profile::Height;

    fn block_profile(height: f64) -> Profile {
        let mut profile = Profile::new();
        profile
            .add_building(
                Polygon::rectangle(20.0, -10.0, 30.0, 10.0).unwrap(),
                Height::Relative(height),
                None,
            )
            .unwrap();
        profile.finish_building();
        profile
    }

    /// Bare ground with a 30 m ridge along x = 25.
    fn ridge_profile() -> Profile {
        let mut profile = Profile::new();
        for (x, z) in [(-10.0, 0.0), (20.0, 0.0), (25.0, 30.0), (30.0, 0.0), (60.0, 0.0)] {
            profile
                .add_topographic_line(&[Point::new(x, -50.0, z), Point::new(x, 50.0, z)])
                .unwrap();
        }
        profile.finish_building();
        profile
    }

    #[test]
    fn test_direct_path_only_in_free_field() {
        let mut profile = Profile::new();
        profile.finish_building();
        let finder = PathFinder::new(PathOptions::new());
        let s = Point::new(0.0, 0.0, 1.0);
        let r = Point::new(50.0, 0.0, 4.0);
        let paths = finder.find_paths(s, r, &profile).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].kind, PathKind::Direct);
        assert!(paths[0].diffraction.is_none());
        assert!((paths[0].length - 2509f64.sqrt()).abs() < 1e-12);
        assert!((paths[0].ground.source_height - 1.0).abs() < 1e-12);
        assert!((paths[0].ground.receiver_height - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_same_position_rejected() {
        let mut profile = Profile::new();
        profile.finish_building();
        let p = Point::new(1.0, 2.0, 3.0);
        let err = PathFinder::default().find_paths(p, p, &profile).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<NoiseError>(),
            Some(NoiseError::Validation(_))
        ));
    }

    #[test]
    fn test_top_path_over_block() {
        let profile = block_profile(10.0);
        let finder = PathFinder::new(PathOptions::new());
        let s = Point::new(0.0, 0.0, 1.0);
        let r = Point::new(50.0, 0.0, 1.0);
        let paths = finder.find_paths(s, r, &profile).unwrap();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[1].kind, PathKind::TopDiffraction);
        // Two roof edges, 10 m apart
        let dif = paths[1].diffraction.unwrap();
        assert!((dif.e - 10.0).abs() < 1e-9);
        let expected = 2.0 * (400.0f64 + 81.0).sqrt() + 10.0 - 50.0;
        assert!((dif.delta - expected).abs() < 1e-9);
        assert!(paths[0].diffraction.unwrap().delta > 0.0);
    }

    #[test]
    fn test_screening_grows_with_height() {
        let s = Point::new(0.0, 0.0, 1.0);
        let r = Point::new(50.0, 0.0, 1.0);
        let finder = PathFinder::default();
        let low = finder.find_paths(s, r, &block_profile(5.0)).unwrap();
        let high = finder.find_paths(s, r, &block_profile(15.0)).unwrap();
        assert!(high[0].diffraction.unwrap().delta > low[0].diffraction.unwrap().delta);
    }

    #[test]
    fn test_ridge_diffracts_over_crest() {
        let profile = ridge_profile();
        let finder = PathFinder::new(PathOptions {
            horizontal_diffraction: true,
            ..PathOptions::new()
        });
        let s = Point::new(0.0, 0.0, 1.0);
        let r = Point::new(50.0, 0.0, 4.0);
        let paths = finder.find_paths(s, r, &profile).unwrap();
        let kinds: Vec<PathKind> = paths.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![PathKind::Direct, PathKind::TopDiffraction]);

        let expected = 1466f64.sqrt() + 1301f64.sqrt() - 2509f64.sqrt();
        let top = &paths[1];
        assert_eq!(top.events.len(), 3);
        match top.events[1] {
            PathEvent::Diffraction(p) => assert!(p.is_close(&Point::new(25.0, 0.0, 30.0))),
            other => panic!("unexpected event {other:?}"),
        }
        let dif = top.diffraction.unwrap();
        assert!((dif.delta - expected).abs() < 1e-9);
        assert_eq!(dif.e, 0.0);
        assert!(dif.favourable_delta < dif.delta);

        let screen = paths[0].diffraction.unwrap();
        assert!((screen.delta - expected).abs() < 1e-9);
    }

    #[test]
    fn test_path_order() {
        let profile = block_profile(10.0);
        let finder = PathFinder::new(PathOptions {
            horizontal_diffraction: true,
            vertical_diffraction: true,
            ..PathOptions::new()
        });
        let s = Point::new(0.0, 0.0, 1.0);
        let r = Point::new(50.0, 0.0, 1.0);
        let kinds: Vec<PathKind> = finder
            .find_paths(s, r, &profile)
            .unwrap()
            .iter()
            .map(|p| p.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                PathKind::Direct,
                PathKind::TopDiffraction,
                PathKind::LateralLeft,
                PathKind::LateralRight
            ]
        );
        let again: Vec<PathKind> = finder
            .find_paths(s, r, &profile)
            .unwrap()
            .iter()
            .map(|p| p.kind)
            .collect();
        assert_eq!(kinds, again);
    }
}
