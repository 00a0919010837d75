use serde::{Deserialize, Serialize};

use crate::{Point, Polygon};

/// How the roof elevation of a building is given.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Height {
    /// Height above the terrain, in metres.
    Relative(f64),
    /// Absolute gutter elevation, in metres.
    Absolute(f64),
}

/// Building footprint extruded up to a flat roof.
#[derive(Debug, Clone)]
pub struct Building {
    pub(crate) footprint: Polygon,
    pub(crate) height: Height,
    pub(crate) wall_absorption: Option<f64>,
    /// Resolved when the profile is finished.
    pub(crate) roof_z: f64,
}

impl Building {
    pub fn footprint(&self) -> &Polygon {
        &self.footprint
    }

    pub fn height(&self) -> Height {
        self.height
    }

    pub fn wall_absorption(&self) -> Option<f64> {
        self.wall_absorption
    }

    /// Absolute roof elevation.
    pub fn roof_z(&self) -> f64 {
        self.roof_z
    }
}

/// Vertical wall of a building footprint edge.
#[derive(Debug, Clone, Copy)]
pub struct Wall {
    pub building: usize,
    pub p0: Point,
    pub p1: Point,
    pub absorption: f64,
}

impl Wall {
    pub fn length(&self) -> f64 {
        self.p0.distance_2d(&self.p1)
    }
}
