//! Propagation paths between a source and a receiver.

mod finder;
mod lateral;
mod reflection;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::Point;
use crate::sim::profile::Profile;

pub use finder::PathFinder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    /// Straight line, possibly screened.
    Direct,
    /// Over the roofs in the vertical plane.
    TopDiffraction,
    /// Around the left side of the obstacles, seen from the source.
    LateralLeft,
    /// Around the right side of the obstacles, seen from the source.
    LateralRight,
    /// Specular reflections on `order` facades.
    Reflection { order: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathEvent {
    Source(Point),
    Diffraction(Point),
    Reflection {
        point: Point,
        wall: usize,
        absorption: f64,
    },
    Receiver(Point),
}

impl PathEvent {
    pub fn position(&self) -> Point {
        match self {
            Self::Source(p) | Self::Diffraction(p) | Self::Receiver(p) => *p,
            Self::Reflection { point, .. } => *point,
        }
    }
}

/// Smallest radius of the curved rays of favourable conditions, in metres.
pub const MIN_RAY_CURVATURE_RADIUS: f64 = 1000.0;

/// Geometry needed for the diffraction loss.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffractionGeometry {
    /// Path length difference to the direct line, in metres.
    pub delta: f64,
    /// Distance between the first and the last diffraction edge, in metres.
    pub e: f64,
    /// Path length difference along curved rays (downward refraction).
    pub favourable_delta: f64,
}

impl DiffractionGeometry {
    /// Geometry whose favourable path difference equals the straight one.
    pub fn new(delta: f64, e: f64) -> Self {
        Self {
            delta,
            e,
            favourable_delta: delta,
        }
    }

    /// Geometry of the polyline `points` diffracted over its interior
    /// vertices, in the vertical plane.
    ///
    /// Under favourable conditions every leg, and the direct line, bends into
    /// an arc of radius `max(1000, 8 d)`.
    pub fn over_edges(points: &[Point], direct_length: f64) -> Self {
        let length = polyline_length(points);
        let e = match points.len() {
            0..=3 => 0.0,
            n => polyline_length(&points[1..n - 1]),
        };
        let radius = MIN_RAY_CURVATURE_RADIUS.max(8.0 * direct_length);
        let arc = |chord: f64| 2.0 * radius * (chord / (2.0 * radius)).min(1.0).asin();
        let curved: f64 = points.windows(2).map(|w| arc(w[0].distance(&w[1]))).sum();
        Self {
            delta: length - direct_length,
            e,
            favourable_delta: curved - arc(direct_length),
        }
    }
}

/// Ground seen by a path, along its unfolded horizontal projection.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundGeometry {
    /// Source height above the terrain.
    pub source_height: f64,
    /// Receiver height above the terrain.
    pub receiver_height: f64,
    /// `(length, G)` spans from the source to the receiver.
    pub spans: Vec<(f64, f64)>,
    /// Overrides the mean `G` of the source region when set.
    pub source_ground_factor: Option<f64>,
}

impl GroundGeometry {
    /// Total projected path length.
    pub fn projected_length(&self) -> f64 {
        self.spans.iter().map(|s| s.0).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropagationPath {
    pub kind: PathKind,
    /// Source first, receiver last.
    pub events: Vec<PathEvent>,
    /// Length of the 3D polyline through all events.
    pub length: f64,
    /// Straight source-receiver distance.
    pub direct_length: f64,
    pub diffraction: Option<DiffractionGeometry>,
    pub ground: GroundGeometry,
}

impl PropagationPath {
    pub fn source(&self) -> Option<Point> {
        self.events.first().map(|e| e.position())
    }

    pub fn receiver(&self) -> Option<Point> {
        self.events.last().map(|e| e.position())
    }

    /// Absorption coefficients of the facades met along the path.
    pub fn reflection_absorptions(&self) -> impl Iterator<Item = f64> + '_ {
        self.events.iter().filter_map(|e| match e {
            PathEvent::Reflection { absorption, .. } => Some(*absorption),
            _ => None,
        })
    }
}

/// Which kinds of paths are searched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathOptions {
    pub horizontal_diffraction: bool,
    pub vertical_diffraction: bool,
    /// 0 disables reflections.
    pub max_reflection_order: usize,
    /// `Gs`, ground factor forced on the source region.
    pub source_ground_factor: Option<f64>,
    /// Facades farther than this from both source and receiver are ignored.
    pub max_reflection_distance: f64,
}

impl PathOptions {
    pub fn new() -> Self {
        Self {
            horizontal_diffraction: false,
            vertical_diffraction: true,
            max_reflection_order: 0,
            source_ground_factor: None,
            max_reflection_distance: 50.0,
        }
    }
}

impl Default for PathOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Length of a 3D polyline.
fn polyline_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| w[0].distance(&w[1])).sum()
}

/// Ground spans along a planar polyline and the end point heights above terrain.
fn ground_along(
    points: &[Point],
    profile: &Profile,
    source_ground_factor: Option<f64>,
) -> Result<GroundGeometry> {
    let mut spans = Vec::new();
    for w in points.windows(2) {
        spans.extend(profile.vertical_profile(w[0], w[1])?.ground_spans());
    }
    let height_of = |p: &Point| -> Result<f64> { Ok((p.z - profile.elevation_at(p.x, p.y)?).max(0.0)) };
    let (source_height, receiver_height) = match (points.first(), points.last()) {
        (Some(s), Some(r)) => (height_of(s)?, height_of(r)?),
        _ => (0.0, 0.0),
    };
    Ok(GroundGeometry {
        source_height,
        receiver_height,
        spans,
        source_ground_factor,
    })
}

/// Gives each planar polyline vertex an elevation interpolated from the first
/// to the last point along the planar length.
fn interpolate_z(points: &mut [Point]) {
    let (Some(first), Some(last)) = (points.first().copied(), points.last().copied()) else {
        return;
    };
    let total: f64 = points.windows(2).map(|w| w[0].distance_2d(&w[1])).sum();
    if total <= 0.0 {
        return;
    }
    let mut run = 0.0;
    for i in 1..points.len() {
        run += points[i - 1].distance_2d(&points[i]);
        points[i].z = first.z + run / total * (last.z - first.z);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_z() {
        let mut pts = vec![
            Point::new(0.0, 0.0, 0.0),
            Point::new(3.0, 0.0, 99.0),
            Point::new(3.0, 1.0, 4.0),
        ];
        interpolate_z(&mut pts);
        assert!((pts[1].z - 3.0).abs() < 1e-12);
        assert!((pts[2].z - 4.0).abs() < 1e-12);
        assert!((polyline_length(&pts) - (18f64.sqrt() + 2f64.sqrt())).abs() < 1e-12);
    }

    #[test]
    fn test_curved_rays_shorten_the_detour() {
        let s = Point::new(0.0, 0.0, 1.0);
        let r = Point::new(200.0, 0.0, 1.0);
        let edge = Point::new(100.0, 0.0, 11.0);
        let direct = s.distance(&r);
        let g = DiffractionGeometry::over_edges(&[s, edge, r], direct);
        assert!((g.delta - (2.0 * (10000.0f64 + 100.0).sqrt() - 200.0)).abs() < 1e-9);
        assert_eq!(g.e, 0.0);
        assert!(g.favourable_delta < g.delta);
        assert!(g.favourable_delta > 0.0);

        let straight = DiffractionGeometry::new(0.4, 2.0);
        assert_eq!(straight.favourable_delta, 0.4);
    }

    #[test]
    fn test_reflection_absorptions() {
        let path = PropagationPath {
            kind: PathKind::Reflection { order: 1 },
            events: vec![
                PathEvent::Source(Point::new(0.0, 0.0, 1.0)),
                PathEvent::Reflection {
                    point: Point::new(5.0, 5.0, 1.0),
                    wall: 3,
                    absorption: 0.2,
                },
                PathEvent::Receiver(Point::new(10.0, 0.0, 1.0)),
            ],
            length: 2.0 * 50f64.sqrt(),
            direct_length: 10.0,
            diffraction: None,
            ground: GroundGeometry {
                source_height: 1.0,
                receiver_height: 1.0,
                spans: vec![(2.0 * 50f64.sqrt(), 0.0)],
                source_ground_factor: None,
            },
        };
        assert_eq!(path.reflection_absorptions().collect::<Vec<_>>(), vec![0.2]);
        assert_eq!(path.source(), Some(Point::new(0.0, 0.0, 1.0)));
        assert!((path.ground.projected_length() - path.length).abs() < 1e-12);
    }
}
