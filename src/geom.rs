pub mod bboxes;
pub mod delaunay;
pub mod hull;
pub mod point;
pub mod polygon;
pub mod segment;
pub mod vector;

/// Geometric precision
pub(crate) const EPS: f64 = 1e-9;
