//! Per-band attenuation of propagation paths.

mod atmosphere;
mod diffraction;
mod ground;
mod meteo;

use anyhow::Result;

use crate::error::NoiseError;
use crate::sim::bands::BandSet;
use crate::sim::paths::{DiffractionGeometry, PathKind, PropagationPath};

pub use atmosphere::{AirAbsorption, AtmosphericConditions, alpha_iso9613};
pub use diffraction::{MAX_DIFFRACTION_DB, diffraction_loss, favourable_diffraction_loss};
pub use ground::{
    favourable_ground_attenuation, favourable_heights, ground_attenuation, region_factors,
};
pub use meteo::{FavourableConditions, WIND_ROSE_SECTORS, sector_index};

/// Shortest distance used in the divergence term, in metres.
pub const MIN_DISTANCE: f64 = 0.1;

/// Attenuation terms of one path in dB, one value per band.
///
/// `ground` and `diffraction` hold the homogeneous terms; their `_favourable`
/// counterparts apply under downward-refracting conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct AttenuationComponents {
    pub band_set: BandSet,
    pub divergence: Vec<f64>,
    pub atmospheric: Vec<f64>,
    pub ground: Vec<f64>,
    pub diffraction: Vec<f64>,
    pub reflection: Vec<f64>,
    pub ground_favourable: Vec<f64>,
    pub diffraction_favourable: Vec<f64>,
    /// Probability of favourable conditions along this path.
    pub favourable_probability: f64,
}

impl AttenuationComponents {
    /// Sum of all terms per band under homogeneous conditions.
    pub fn homogeneous_total(&self) -> Vec<f64> {
        self.sum_with(&self.ground, &self.diffraction)
    }

    /// Sum of all terms per band under favourable conditions.
    pub fn favourable_total(&self) -> Vec<f64> {
        self.sum_with(&self.ground_favourable, &self.diffraction_favourable)
    }

    fn sum_with(&self, ground: &[f64], diffraction: &[f64]) -> Vec<f64> {
        (0..self.band_set.len())
            .map(|i| {
                self.divergence[i]
                    + self.atmospheric[i]
                    + ground[i]
                    + diffraction[i]
                    + self.reflection[i]
            })
            .collect()
    }

    /// Long-term attenuation per band: the energetic mean of the homogeneous
    /// and favourable levels, weighted by the favourable probability.
    pub fn total(&self) -> Vec<f64> {
        let p = self.favourable_probability;
        if p <= 0.0 {
            return self.homogeneous_total();
        }
        if p >= 1.0 {
            return self.favourable_total();
        }
        self.homogeneous_total()
            .into_iter()
            .zip(self.favourable_total())
            .map(|(h, f)| -10.0 * (p * 10f64.powf(-f / 10.0) + (1.0 - p) * 10f64.powf(-h / 10.0)).log10())
            .collect()
    }
}

/// Geometric divergence of a point source in dB.
pub fn divergence(distance: f64) -> f64 {
    20.0 * distance.max(MIN_DISTANCE).log10() + 11.0
}

/// Reflection loss of one facade in dB.
pub fn reflection_loss(absorption: f64) -> f64 {
    10.0 * (1.0 / (1.0 - absorption)).log10()
}

/// Scores propagation paths for a fixed band set and atmosphere.
#[derive(Debug, Clone)]
pub struct AttenuationCalculator {
    band_set: BandSet,
    air: AirAbsorption,
    wavelengths: Vec<f64>,
    meteo: FavourableConditions,
}

impl AttenuationCalculator {
    pub fn new(band_set: BandSet, conditions: &AtmosphericConditions) -> Result<Self> {
        Ok(Self {
            band_set,
            air: AirAbsorption::iso9613(conditions, band_set)?,
            wavelengths: band_set.wavelengths(conditions.celerity()),
            meteo: FavourableConditions::homogeneous(),
        })
    }

    /// Mixes in favourable conditions with the given occurrence.
    pub fn with_favourable_conditions(mut self, meteo: FavourableConditions) -> Result<Self> {
        meteo.validate()?;
        self.meteo = meteo;
        Ok(self)
    }

    pub fn favourable_conditions(&self) -> &FavourableConditions {
        &self.meteo
    }

    /// Replaces the computed air absorption with a precomputed dB/km table.
    pub fn with_alpha_table(mut self, alpha: Vec<f64>) -> Result<Self> {
        self.air = AirAbsorption::from_table(self.band_set, alpha)?;
        Ok(self)
    }

    pub fn band_set(&self) -> BandSet {
        self.band_set
    }

    pub fn air_absorption(&self) -> &AirAbsorption {
        &self.air
    }

    pub fn score(&self, path: &PropagationPath) -> Result<AttenuationComponents> {
        if !path.length.is_finite() || path.length < 0.0 {
            return Err(NoiseError::Validation(format!(
                "path length must be finite and >= 0, got {}",
                path.length
            ))
            .into());
        }
        let n = self.band_set.len();
        let d = path.length;

        let geometry = match path.kind {
            PathKind::Direct
            | PathKind::TopDiffraction
            | PathKind::LateralLeft
            | PathKind::LateralRight => path.diffraction.as_ref(),
            PathKind::Reflection { .. } => None,
        };
        let per_band = |loss: fn(&DiffractionGeometry, f64) -> f64| -> Vec<f64> {
            match geometry {
                Some(g) => self.wavelengths.iter().map(|&l| loss(g, l)).collect(),
                None => vec![0.0; n],
            }
        };
        let diffraction = per_band(diffraction_loss);
        let diffraction_favourable = per_band(favourable_diffraction_loss);

        let favourable_probability = match (path.source(), path.receiver()) {
            (Some(s), Some(r)) => self.meteo.probability(s, r),
            _ => 0.0,
        };

        let mut reflection = 0.0;
        for absorption in path.reflection_absorptions() {
            if !absorption.is_finite() || !(0.0..1.0).contains(&absorption) {
                return Err(NoiseError::Validation(format!(
                    "reflecting facade absorption must be in [0, 1), got {absorption}"
                ))
                .into());
            }
            reflection += reflection_loss(absorption);
        }

        Ok(AttenuationComponents {
            band_set: self.band_set,
            divergence: vec![divergence(d); n],
            atmospheric: self.air.attenuation(d),
            ground: ground_attenuation(&path.ground, self.band_set),
            diffraction,
            reflection: vec![reflection; n],
            ground_favourable: favourable_ground_attenuation(&path.ground, self.band_set),
            diffraction_favourable,
            favourable_probability,
        })
    }
}
