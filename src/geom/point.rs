use crate::Vector;
use crate::geom::EPS;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Sub;

/// Point in a local planar coordinate system. `z` is the absolute elevation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_close(&self, other: &Self) -> bool {
        self.is_close_2d(other) && (self.z - other.z).abs() < EPS
    }

    /// True if both points share the same planar position, whatever their elevation.
    pub fn is_close_2d(&self, other: &Self) -> bool {
        (self.x - other.x).abs() < EPS && (self.y - other.y).abs() < EPS
    }

    pub fn distance(&self, other: &Self) -> f64 {
        (*other - *self).length()
    }

    pub fn distance_2d(&self, other: &Self) -> f64 {
        (*other - *self).length_2d()
    }

    pub fn with_z(&self, z: f64) -> Self {
        Self::new(self.x, self.y, z)
    }

    /// Point at relative position `t` on the segment `a -> b`, elevation included.
    pub fn lerp(a: Self, b: Self, t: f64) -> Self {
        Self::new(
            a.x + (b.x - a.x) * t,
            a.y + (b.y - a.y) * t,
            a.z + (b.z - a.z) * t,
        )
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prec = f.precision().unwrap_or(2);
        write!(f, "({:.prec$}, {:.prec$}, {:.prec$})", self.x, self.y, self.z)
    }
}

impl Sub for Point {
    type Output = Vector;
    fn sub(self, other: Self) -> Vector {
        Vector::from_points(other, self)
    }
}
