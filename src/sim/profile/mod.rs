//! Static propagation environment: buildings, ground areas and terrain.
//!
//! A [`Profile`] is filled once, then locked with [`Profile::finish_building`].
//! Finishing builds the terrain triangulation, resolves roof elevations and
//! creates the spatial indices. Every query requires a finished profile and
//! only reads it, so a finished profile can be shared between threads.

mod building;
mod ground;
mod index;
mod terrain;

use anyhow::Result;
use tracing::debug;

use crate::error::{NoiseError, check_unit_interval};
use crate::geom::EPS;
use crate::geom::bboxes::BBox2;
use crate::geom::segment::distance_to_segment;
use crate::{Point, Polygon};

pub use building::{Building, Height, Wall};
pub use ground::{GroundArea, mean_g};

use index::GridIndex;
use terrain::Terrain;

/// What is found at a point of a vertical cut.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CutKind {
    /// Terrain elevation sample.
    Topography,
    /// Building wall crossing.
    Wall {
        building: usize,
        roof_z: f64,
        entering: bool,
    },
    /// Ground area boundary. `g` applies from here on.
    GroundBoundary { g: f64 },
}

/// Event along a vertical cut, at `distance` metres from the cut start.
///
/// `position.z` is the terrain elevation there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutPoint {
    pub distance: f64,
    pub position: Point,
    pub kind: CutKind,
}

/// Ordered events met along the vertical plane between two points.
#[derive(Debug, Clone)]
pub struct VerticalProfile {
    pub p1: Point,
    pub p2: Point,
    /// Ground absorption at the start of the cut.
    pub start_g: f64,
    /// Number of buildings containing the start of the cut.
    pub start_buildings: usize,
    pub points: Vec<CutPoint>,
}

impl VerticalProfile {
    /// Planar length of the cut.
    pub fn length(&self) -> f64 {
        self.p1.distance_2d(&self.p2)
    }

    pub fn walls(&self) -> impl Iterator<Item = &CutPoint> {
        self.points
            .iter()
            .filter(|p| matches!(p.kind, CutKind::Wall { .. }))
    }

    /// Elevation of the straight line p1-p2 at a distance along the cut.
    pub fn line_z_at(&self, distance: f64) -> f64 {
        let length = self.length();
        if length > 0.0 {
            self.p1.z + distance / length * (self.p2.z - self.p1.z)
        } else {
            self.p1.z
        }
    }

    /// Terrain samples between the two ends that rise above the line p1-p2.
    ///
    /// The terrain is planar between samples, so these are the only places
    /// where it can cut the line of sight.
    pub fn terrain_above_line(&self) -> impl Iterator<Item = &CutPoint> {
        let length = self.length();
        self.points.iter().filter(move |p| {
            p.kind == CutKind::Topography
                && p.distance > EPS
                && p.distance < length - EPS
                && p.position.z > self.line_z_at(p.distance) + EPS
        })
    }

    /// Terrain elevation at a distance along the cut.
    pub fn ground_z_at(&self, distance: f64) -> f64 {
        let topo: Vec<&CutPoint> = self
            .points
            .iter()
            .filter(|p| p.kind == CutKind::Topography)
            .collect();
        match topo.iter().position(|p| p.distance >= distance) {
            Some(0) => topo[0].position.z,
            Some(i) => {
                let (a, b) = (topo[i - 1], topo[i]);
                let span = b.distance - a.distance;
                if span < EPS {
                    b.position.z
                } else {
                    a.position.z + (distance - a.distance) / span * (b.position.z - a.position.z)
                }
            }
            None => topo.last().map(|p| p.position.z).unwrap_or(0.0),
        }
    }

    /// `(length, G)` spans covering the cut. Building footprints count as hard ground.
    pub fn ground_spans(&self) -> Vec<(f64, f64)> {
        let mut spans = Vec::new();
        let mut g = self.start_g;
        let mut inside = self.start_buildings;
        let mut last = 0.0;
        for p in &self.points {
            let (new_g, new_inside) = match p.kind {
                CutKind::Topography => continue,
                CutKind::GroundBoundary { g: next } => (next, inside),
                CutKind::Wall { entering, .. } => {
                    if entering {
                        (g, inside + 1)
                    } else {
                        (g, inside.saturating_sub(1))
                    }
                }
            };
            if p.distance > last {
                spans.push((p.distance - last, if inside > 0 { 0.0 } else { g }));
                last = p.distance;
            }
            g = new_g;
            inside = new_inside;
        }
        let length = self.length();
        if length > last {
            spans.push((length - last, if inside > 0 { 0.0 } else { g }));
        }
        spans
    }
}

/// Buildings, ground areas and terrain of a study area.
#[derive(Debug, Clone)]
pub struct Profile {
    buildings: Vec<Building>,
    ground_areas: Vec<GroundArea>,
    topo_points: Vec<Point>,
    default_ground_absorption: f64,
    default_elevation: f64,
    default_wall_absorption: f64,
    finished: bool,
    terrain: Option<Terrain>,
    walls: Vec<Wall>,
    building_index: GridIndex,
    area_index: GridIndex,
    wall_index: GridIndex,
}

impl Profile {
    pub fn new() -> Self {
        Self {
            buildings: Vec::new(),
            ground_areas: Vec::new(),
            topo_points: Vec::new(),
            default_ground_absorption: 0.0,
            default_elevation: 0.0,
            default_wall_absorption: 0.1,
            finished: false,
            terrain: None,
            walls: Vec::new(),
            building_index: GridIndex::default(),
            area_index: GridIndex::default(),
            wall_index: GridIndex::default(),
        }
    }

    fn ensure_not_finished(&self) -> Result<()> {
        if self.finished {
            return Err(NoiseError::ProfileFinished.into());
        }
        Ok(())
    }

    fn ensure_finished(&self) -> Result<()> {
        if !self.finished {
            return Err(NoiseError::ProfileNotFinished.into());
        }
        Ok(())
    }

    /// Ground absorption used where no ground area applies.
    pub fn set_default_ground_absorption(&mut self, g: f64) -> Result<()> {
        self.ensure_not_finished()?;
        check_unit_interval(g, "default ground absorption")?;
        self.default_ground_absorption = g;
        Ok(())
    }

    /// Elevation used outside the terrain triangulation.
    pub fn set_default_elevation(&mut self, z: f64) -> Result<()> {
        self.ensure_not_finished()?;
        if !z.is_finite() {
            return Err(NoiseError::Validation(format!("default elevation is not finite: {z}")).into());
        }
        self.default_elevation = z;
        Ok(())
    }

    /// Absorption of walls of buildings added without their own coefficient.
    pub fn set_default_wall_absorption(&mut self, alpha: f64) -> Result<()> {
        self.ensure_not_finished()?;
        check_unit_interval(alpha, "default wall absorption")?;
        self.default_wall_absorption = alpha;
        Ok(())
    }

    /// Adds a building and returns its index.
    pub fn add_building(
        &mut self,
        footprint: Polygon,
        height: Height,
        wall_absorption: Option<f64>,
    ) -> Result<usize> {
        self.ensure_not_finished()?;
        match height {
            Height::Relative(h) if !h.is_finite() || h <= 0.0 => {
                return Err(NoiseError::Validation(format!(
                    "building height must be > 0, got {h}"
                ))
                .into());
            }
            Height::Absolute(z) if !z.is_finite() => {
                return Err(NoiseError::Validation(format!(
                    "building roof elevation is not finite: {z}"
                ))
                .into());
            }
            _ => {}
        }
        if let Some(alpha) = wall_absorption {
            check_unit_interval(alpha, "wall absorption")?;
        }
        self.buildings.push(Building {
            footprint,
            height,
            wall_absorption,
            roof_z: 0.0,
        });
        Ok(self.buildings.len() - 1)
    }

    /// Adds a ground area and returns its index. Later areas take precedence.
    pub fn add_ground_area(&mut self, polygon: Polygon, g: f64) -> Result<usize> {
        self.ensure_not_finished()?;
        check_unit_interval(g, "ground absorption")?;
        self.ground_areas.push(GroundArea { polygon, g });
        Ok(self.ground_areas.len() - 1)
    }

    /// Adds the vertices of a 3D polyline to the terrain model.
    pub fn add_topographic_line(&mut self, points: &[Point]) -> Result<()> {
        self.ensure_not_finished()?;
        if points.len() < 2 {
            return Err(NoiseError::Validation(format!(
                "topographic line needs at least 2 points, got {}",
                points.len()
            ))
            .into());
        }
        if points.iter().any(|p| !p.is_finite()) {
            return Err(
                NoiseError::Validation("topographic line has non-finite coordinates".to_string())
                    .into(),
            );
        }
        self.topo_points.extend_from_slice(points);
        Ok(())
    }

    /// Locks the profile and builds the query structures.
    ///
    /// Calling it again has no effect.
    pub fn finish_building(&mut self) {
        if self.finished {
            return;
        }

        self.terrain = if self.topo_points.is_empty() {
            None
        } else {
            Terrain::new(self.topo_points.clone())
        };

        let roofs: Vec<f64> = self
            .buildings
            .iter()
            .map(|b| match b.height {
                Height::Absolute(z) => z,
                Height::Relative(h) => {
                    let outer = b.footprint.outer();
                    let mean = outer
                        .iter()
                        .map(|p| self.elevation_unchecked(p.x, p.y))
                        .sum::<f64>()
                        / outer.len() as f64;
                    mean + h
                }
            })
            .collect();
        for (b, roof_z) in self.buildings.iter_mut().zip(roofs) {
            b.roof_z = roof_z;
        }

        self.walls = self
            .buildings
            .iter()
            .enumerate()
            .flat_map(|(i, b)| {
                let absorption = b.wall_absorption.unwrap_or(self.default_wall_absorption);
                b.footprint.edges().into_iter().map(move |(p0, p1)| Wall {
                    building: i,
                    p0,
                    p1,
                    absorption,
                })
            })
            .collect();

        let building_boxes: Vec<BBox2> = self.buildings.iter().map(|b| b.footprint.bbox()).collect();
        let area_boxes: Vec<BBox2> = self.ground_areas.iter().map(|a| a.polygon.bbox()).collect();
        let wall_boxes: Vec<BBox2> = self
            .walls
            .iter()
            .map(|w| BBox2::from_segment(w.p0, w.p1))
            .collect();
        self.building_index = GridIndex::new(&building_boxes);
        self.area_index = GridIndex::new(&area_boxes);
        self.wall_index = GridIndex::new(&wall_boxes);
        self.finished = true;

        debug!(
            buildings = self.buildings.len(),
            walls = self.walls.len(),
            ground_areas = self.ground_areas.len(),
            triangles = self.terrain.as_ref().map(|t| t.num_triangles()).unwrap_or(0),
            "Profile finished"
        );
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    pub fn ground_areas(&self) -> &[GroundArea] {
        &self.ground_areas
    }

    /// Building walls, by building then edge order. Empty until finished.
    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    pub fn default_ground_absorption(&self) -> f64 {
        self.default_ground_absorption
    }

    pub fn default_elevation(&self) -> f64 {
        self.default_elevation
    }

    fn elevation_unchecked(&self, x: f64, y: f64) -> f64 {
        self.terrain
            .as_ref()
            .and_then(|t| t.elevation_at(x, y))
            .unwrap_or(self.default_elevation)
    }

    fn ground_absorption_unchecked(&self, p: &Point) -> f64 {
        let candidates = self.area_index.find_at(p);
        candidates
            .iter()
            .rev()
            .find(|&&i| self.ground_areas[i].polygon.contains(p))
            .map(|&i| self.ground_areas[i].g)
            .unwrap_or(self.default_ground_absorption)
    }

    /// Terrain elevation, or the default elevation outside the terrain model.
    pub fn elevation_at(&self, x: f64, y: f64) -> Result<f64> {
        self.ensure_finished()?;
        Ok(self.elevation_unchecked(x, y))
    }

    /// Ground absorption `G` at a point; the last added area containing it wins.
    pub fn ground_absorption_at(&self, p: &Point) -> Result<f64> {
        self.ensure_finished()?;
        Ok(self.ground_absorption_unchecked(p))
    }

    /// Events along the vertical plane from p1 to p2, ordered by distance.
    pub fn vertical_profile(&self, p1: Point, p2: Point) -> Result<VerticalProfile> {
        self.ensure_finished()?;
        let length = p1.distance_2d(&p2);
        let at = |t: f64| {
            let q = Point::lerp(p1, p2, t);
            q.with_z(self.elevation_unchecked(q.x, q.y))
        };
        let mut points: Vec<CutPoint> = Vec::new();

        // Terrain
        let mut topo = vec![(0.0, self.elevation_unchecked(p1.x, p1.y))];
        if let Some(terrain) = &self.terrain {
            topo.extend(
                terrain
                    .edge_crossings(p1, p2)
                    .into_iter()
                    .filter(|(t, _)| *t > EPS && *t < 1.0 - EPS),
            );
        }
        topo.push((1.0, self.elevation_unchecked(p2.x, p2.y)));
        for (t, z) in topo {
            points.push(CutPoint {
                distance: t * length,
                position: Point::lerp(p1, p2, t).with_z(z),
                kind: CutKind::Topography,
            });
        }

        // Buildings
        let mut start_buildings = 0;
        for b in self.building_index.find_along_segment(&p1, &p2) {
            let building = &self.buildings[b];
            for (ta, tb) in inside_intervals(&building.footprint, p1, p2) {
                if ta <= EPS {
                    start_buildings += 1;
                } else {
                    points.push(CutPoint {
                        distance: ta * length,
                        position: at(ta),
                        kind: CutKind::Wall {
                            building: b,
                            roof_z: building.roof_z,
                            entering: true,
                        },
                    });
                }
                if tb < 1.0 - EPS {
                    points.push(CutPoint {
                        distance: tb * length,
                        position: at(tb),
                        kind: CutKind::Wall {
                            building: b,
                            roof_z: building.roof_z,
                            entering: false,
                        },
                    });
                }
            }
        }

        // Ground areas
        let mut ts: Vec<f64> = vec![0.0, 1.0];
        for a in self.area_index.find_along_segment(&p1, &p2) {
            ts.extend(self.ground_areas[a].polygon.boundary_crossings(p1, p2));
        }
        ts.sort_by(f64::total_cmp);
        ts.dedup_by(|a, b| (*a - *b).abs() < EPS);
        let g_of = |ta: f64, tb: f64| {
            self.ground_absorption_unchecked(&Point::lerp(p1, p2, 0.5 * (ta + tb)))
        };
        let start_g = if ts.len() >= 2 {
            g_of(ts[0], ts[1])
        } else {
            self.ground_absorption_unchecked(&p1)
        };
        let mut current_g = start_g;
        for w in ts.windows(3) {
            let g = g_of(w[1], w[2]);
            if (g - current_g).abs() > EPS {
                points.push(CutPoint {
                    distance: w[1] * length,
                    position: at(w[1]),
                    kind: CutKind::GroundBoundary { g },
                });
                current_g = g;
            }
        }

        points.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        Ok(VerticalProfile {
            p1,
            p2,
            start_g,
            start_buildings,
            points,
        })
    }

    /// Buildings whose interior the 3D segment p1-p2 passes through below the roof.
    ///
    /// Touching a wall at either end of the segment does not count.
    pub fn obstructing_buildings(&self, p1: Point, p2: Point) -> Result<Vec<usize>> {
        self.ensure_finished()?;
        let z_at = |t: f64| p1.z + t * (p2.z - p1.z);
        let found = self
            .building_index
            .find_along_segment(&p1, &p2)
            .into_iter()
            .filter(|&b| {
                let building = &self.buildings[b];
                inside_intervals(&building.footprint, p1, p2)
                    .iter()
                    .any(|&(ta, tb)| z_at(ta).min(z_at(tb)) < building.roof_z - EPS)
            })
            .collect();
        Ok(found)
    }

    /// True if the terrain rises above the segment p1-p2 somewhere between its ends.
    pub fn terrain_hides(&self, p1: Point, p2: Point) -> Result<bool> {
        Ok(self.vertical_profile(p1, p2)?.terrain_above_line().next().is_some())
    }

    /// True if a building or the terrain blocks the line of sight between p1 and p2.
    pub fn is_obstructed(&self, p1: Point, p2: Point) -> Result<bool> {
        Ok(!self.obstructing_buildings(p1, p2)?.is_empty() || self.terrain_hides(p1, p2)?)
    }

    /// Indices of walls within `radius` metres of `p`, in wall order.
    pub fn walls_near(&self, p: &Point, radius: f64) -> Result<Vec<usize>> {
        self.ensure_finished()?;
        let bbox = BBox2::from_segment(*p, *p).inflate(radius);
        Ok(self
            .wall_index
            .find_in_bbox(&bbox)
            .into_iter()
            .filter(|&w| distance_to_segment(*p, self.walls[w].p0, self.walls[w].p1) <= radius)
            .collect())
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new()
    }
}

/// Parts `[ta, tb]` of the planar segment p1-p2 lying inside the polygon.
fn inside_intervals(polygon: &Polygon, p1: Point, p2: Point) -> Vec<(f64, f64)> {
    let mut ts = vec![0.0];
    ts.extend(polygon.boundary_crossings(p1, p2));
    ts.push(1.0);
    ts.sort_by(f64::total_cmp);
    ts.dedup_by(|a, b| (*a - *b).abs() < EPS);

    let mut intervals: Vec<(f64, f64)> = Vec::new();
    for w in ts.windows(2) {
        let mid = Point::lerp(p1, p2, 0.5 * (w[0] + w[1]));
        if !polygon.contains(&mid) {
            continue;
        }
        match intervals.last_mut() {
            Some(last) if (last.1 - w[0]).abs() < EPS => last.1 = w[1],
            _ => intervals.push((w[0], w[1])),
        }
    }
    intervals
}
