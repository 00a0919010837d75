//! Occurrence of downward-refracting (favourable) propagation conditions.

use std::f64::consts::{FRAC_PI_2, TAU};

use anyhow::Result;

use crate::Point;
use crate::error::NoiseError;

/// Number of direction sectors in a wind rose.
pub const WIND_ROSE_SECTORS: usize = 16;

/// Long-term probability of favourable conditions along a path.
///
/// Sector `i` of a wind rose covers propagation bearings centred on
/// `(i + 1) * 22.5°` clockwise from north, so north is the last sector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FavourableConditions {
    /// Same probability in every direction.
    Uniform(f64),
    /// One probability per direction sector.
    WindRose([f64; WIND_ROSE_SECTORS]),
}

impl FavourableConditions {
    /// Homogeneous conditions only.
    pub fn homogeneous() -> Self {
        Self::Uniform(0.0)
    }

    /// Fails with [`NoiseError::Config`] unless every probability is in [0, 1].
    pub fn validate(&self) -> Result<()> {
        let values: &[f64] = match self {
            Self::Uniform(p) => std::slice::from_ref(p),
            Self::WindRose(rose) => rose,
        };
        for (i, p) in values.iter().enumerate() {
            if !p.is_finite() || !(0.0..=1.0).contains(p) {
                return Err(NoiseError::Config(format!(
                    "favourable probability #{i} must be in [0, 1], got {p}"
                ))
                .into());
            }
        }
        Ok(())
    }

    /// Probability of favourable conditions for sound travelling from
    /// `source` to `receiver`.
    pub fn probability(&self, source: Point, receiver: Point) -> f64 {
        match self {
            Self::Uniform(p) => *p,
            Self::WindRose(rose) => rose[sector_index(source, receiver)],
        }
    }
}

impl Default for FavourableConditions {
    fn default() -> Self {
        Self::homogeneous()
    }
}

/// Wind rose sector of the planar propagation direction source -> receiver.
pub fn sector_index(source: Point, receiver: Point) -> usize {
    let width = TAU / WIND_ROSE_SECTORS as f64;
    let angle = (receiver.y - source.y).atan2(receiver.x - source.x);
    // Clockwise from the start of the north sector
    let turned = (FRAC_PI_2 - angle + width / 2.0).rem_euclid(TAU);
    match (turned / width) as usize {
        0 => WIND_ROSE_SECTORS - 1,
        k => (k - 1).min(WIND_ROSE_SECTORS - 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn towards(bearing_deg: f64) -> Point {
        let angle = FRAC_PI_2 - bearing_deg.to_radians();
        Point::new(100.0 * angle.cos(), 100.0 * angle.sin(), 0.0)
    }

    #[test]
    fn test_sector_index() {
        let o = Point::new(0.0, 0.0, 0.0);
        assert_eq!(sector_index(o, towards(0.0)), 15);
        assert_eq!(sector_index(o, towards(-10.0)), 15);
        assert_eq!(sector_index(o, towards(10.0)), 15);
        assert_eq!(sector_index(o, towards(22.5)), 0);
        assert_eq!(sector_index(o, towards(90.0)), 3);
        assert_eq!(sector_index(o, towards(180.0)), 7);
        assert_eq!(sector_index(o, towards(337.5)), 14);
        // Every sector is reachable, in order
        for i in 0..WIND_ROSE_SECTORS {
            let bearing = (i + 1) as f64 * 22.5 + 5.0;
            assert_eq!(sector_index(o, towards(bearing)), i);
        }
    }

    #[test]
    fn test_probability() {
        let s = Point::new(0.0, 0.0, 1.0);
        let r = Point::new(100.0, 0.0, 4.0);
        assert_eq!(FavourableConditions::default().probability(s, r), 0.0);
        assert_eq!(FavourableConditions::Uniform(0.4).probability(s, r), 0.4);

        let mut rose = [0.5; WIND_ROSE_SECTORS];
        rose[3] = 0.9;
        let conditions = FavourableConditions::WindRose(rose);
        assert_eq!(conditions.probability(s, r), 0.9);
        // Travelling west is a different sector
        assert_eq!(conditions.probability(r, s), 0.5);
    }

    #[test]
    fn test_validate() {
        assert!(FavourableConditions::Uniform(1.0).validate().is_ok());
        let err = FavourableConditions::Uniform(1.5).validate().unwrap_err();
        assert!(matches!(err.downcast_ref::<NoiseError>(), Some(NoiseError::Config(_))));
        let mut rose = [0.5; WIND_ROSE_SECTORS];
        rose[7] = f64::NAN;
        assert!(FavourableConditions::WindRose(rose).validate().is_err());
    }
}
