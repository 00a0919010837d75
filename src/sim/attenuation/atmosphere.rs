use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::NoiseError;
use crate::sim::bands::BandSet;

/// Reference air temperature in K.
const REFERENCE_TEMPERATURE_K: f64 = 293.15;
/// Triple point isotherm temperature in K.
const TRIPLE_POINT_K: f64 = 273.16;
/// Reference atmospheric pressure in Pa.
const REFERENCE_PRESSURE: f64 = 101_325.0;

/// Meteorological conditions of the propagation medium.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtmosphericConditions {
    /// Air temperature in °C.
    pub temperature: f64,
    /// Relative humidity in %.
    pub humidity: f64,
    /// Atmospheric pressure in Pa.
    pub pressure: f64,
}

impl AtmosphericConditions {
    pub fn new() -> Self {
        Self {
            temperature: 15.0,
            humidity: 70.0,
            pressure: REFERENCE_PRESSURE,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.temperature.is_finite() || self.temperature <= -273.15 {
            return Err(NoiseError::Config(format!(
                "temperature must be above absolute zero, got {} °C",
                self.temperature
            ))
            .into());
        }
        if !self.humidity.is_finite() || !(0.0..=100.0).contains(&self.humidity) {
            return Err(NoiseError::Config(format!(
                "humidity must be in [0, 100] %, got {}",
                self.humidity
            ))
            .into());
        }
        if !self.pressure.is_finite() || self.pressure <= 0.0 {
            return Err(
                NoiseError::Config(format!("pressure must be > 0, got {}", self.pressure)).into(),
            );
        }
        Ok(())
    }

    /// Speed of sound in m/s.
    pub fn celerity(&self) -> f64 {
        343.2 * ((self.temperature + 273.15) / REFERENCE_TEMPERATURE_K).sqrt()
    }
}

impl Default for AtmosphericConditions {
    fn default() -> Self {
        Self::new()
    }
}

/// Pure-tone air absorption coefficient in dB/km (ISO 9613-1).
pub fn alpha_iso9613(frequency: f64, temperature: f64, humidity: f64, pressure: f64) -> f64 {
    let t = temperature + 273.15;
    let t_rel = t / REFERENCE_TEMPERATURE_K;
    let p_rel = pressure / REFERENCE_PRESSURE;

    // Molar concentration of water vapour in %
    let c = -6.8346 * (TRIPLE_POINT_K / t).powf(1.261) + 4.6151;
    let h = humidity * 10f64.powf(c) / p_rel;

    // Relaxation frequencies of oxygen and nitrogen
    let fr_o = p_rel * (24.0 + 4.04e4 * h * (0.02 + h) / (0.391 + h));
    let fr_n = p_rel
        * t_rel.powf(-0.5)
        * (9.0 + 280.0 * h * (-4.170 * (t_rel.powf(-1.0 / 3.0) - 1.0)).exp());

    let f2 = frequency * frequency;
    let per_metre = 8.686
        * f2
        * (1.84e-11 / p_rel * t_rel.sqrt()
            + t_rel.powf(-2.5)
                * (0.01275 * (-2239.1 / t).exp() / (fr_o + f2 / fr_o)
                    + 0.1068 * (-3352.0 / t).exp() / (fr_n + f2 / fr_n)));
    1000.0 * per_metre
}

/// Air absorption coefficients per band, in dB/km.
#[derive(Debug, Clone, PartialEq)]
pub struct AirAbsorption {
    band_set: BandSet,
    alpha: Vec<f64>,
}

impl AirAbsorption {
    /// Coefficients at the exact mid-band frequencies for the given conditions.
    pub fn iso9613(conditions: &AtmosphericConditions, band_set: BandSet) -> Result<Self> {
        conditions.validate()?;
        let alpha = band_set
            .exact_frequencies()
            .into_iter()
            .map(|f| {
                alpha_iso9613(
                    f,
                    conditions.temperature,
                    conditions.humidity,
                    conditions.pressure,
                )
            })
            .collect();
        Ok(Self { band_set, alpha })
    }

    /// Precomputed coefficients, one per band of `band_set`.
    pub fn from_table(band_set: BandSet, alpha: Vec<f64>) -> Result<Self> {
        if alpha.len() != band_set.len() {
            return Err(NoiseError::Config(format!(
                "air absorption table has {} values, {:?} needs {}",
                alpha.len(),
                band_set,
                band_set.len()
            ))
            .into());
        }
        if let Some(a) = alpha.iter().find(|a| !a.is_finite() || **a < 0.0) {
            return Err(NoiseError::Config(format!(
                "air absorption coefficient must be >= 0, got {a}"
            ))
            .into());
        }
        Ok(Self { band_set, alpha })
    }

    pub fn band_set(&self) -> BandSet {
        self.band_set
    }

    pub fn alpha(&self) -> &[f64] {
        &self.alpha
    }

    /// Attenuation in dB per band over `distance` metres.
    pub fn attenuation(&self, distance: f64) -> Vec<f64> {
        self.alpha.iter().map(|a| a * distance / 1000.0).collect()
    }
}
