use crate::Point;
use std::ops::{Mul, Neg};

/// Displacement between two points.
///
/// Most propagation geometry happens in the horizontal plane, so the planar
/// products ignore `dz`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl Vector {
    pub fn new(dx: f64, dy: f64, dz: f64) -> Self {
        Self { dx, dy, dz }
    }

    pub fn from_points(beg: Point, end: Point) -> Self {
        Self::new(end.x - beg.x, end.y - beg.y, end.z - beg.z)
    }

    /// Z component of the cross product of the horizontal projections.
    ///
    /// Positive when `other` turns counter-clockwise from `self`.
    pub fn cross_2d(&self, other: &Self) -> f64 {
        self.dx * other.dy - self.dy * other.dx
    }

    /// Dot product of the horizontal projections.
    pub fn dot_2d(&self, other: &Self) -> f64 {
        self.dx * other.dx + self.dy * other.dy
    }

    pub fn length(&self) -> f64 {
        self.length_2d().hypot(self.dz)
    }

    /// Length of the horizontal projection.
    pub fn length_2d(&self) -> f64 {
        self.dx.hypot(self.dy)
    }
}

impl Neg for Vector {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.dx, -self.dy, -self.dz)
    }
}

impl Mul<f64> for Vector {
    type Output = Self;
    fn mul(self, k: f64) -> Self {
        Self::new(self.dx * k, self.dy * k, self.dz * k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points() {
        let p0 = Point::new(1.0, 1.0, 1.0);
        let p1 = Point::new(4.0, 5.0, 13.0);
        let v = Vector::from_points(p0, p1);
        assert_eq!(-v, Vector::from_points(p1, p0));
        assert_eq!(v * 2.0, Vector::new(6.0, 8.0, 24.0));
        assert!((v.length_2d() - 5.0).abs() < 1e-12);
        assert!((v.length() - 13.0).abs() < 1e-12);
    }

    #[test]
    fn test_planar_products() {
        let vx = Vector::new(1.0, 0.0, 3.0);
        let vy = Vector::new(0.0, 1.0, -2.0);
        assert!((vx.cross_2d(&vy) - 1.0).abs() < 1e-12);
        assert!((vy.cross_2d(&vx) + 1.0).abs() < 1e-12);
        assert_eq!(vx.dot_2d(&vy), 0.0);
        assert!((vx.dot_2d(&(vx * 2.0)) - 2.0).abs() < 1e-12);
    }
}
