use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::NoiseError;
use crate::sim::attenuation::{
    AtmosphericConditions, AttenuationCalculator, FavourableConditions, WIND_ROSE_SECTORS,
};
use crate::sim::bands::BandSet;
use crate::sim::paths::PathOptions;
use crate::sim::profile::Profile;

/// Settings of a receiver batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    // Bands
    pub band_set: BandSet,

    // Atmosphere
    /// Air temperature in °C.
    pub temperature: f64,
    /// Relative humidity in %.
    pub humidity: f64,
    /// Atmospheric pressure in Pa.
    pub pressure: f64,
    /// Precomputed air absorption in dB/km per band, replacing ISO 9613-1.
    pub alpha_atmo: Option<Vec<f64>>,

    // Meteorology
    /// Probability of favourable propagation conditions in every direction.
    pub favourable_probability: f64,
    /// Probability per 22.5° direction sector, replacing `favourable_probability`.
    pub wind_rose: Option<[f64; WIND_ROSE_SECTORS]>,

    // Paths
    pub max_reflection_order: usize,
    pub horizontal_diffraction: bool,
    pub vertical_diffraction: bool,
    /// `Gs` forced on the source region of every path.
    pub source_ground_factor: Option<f64>,
    /// Sources farther than this from a receiver are skipped, in metres.
    pub max_source_distance: f64,
    /// Facades farther than this from both ends of a path are not reflecting, in metres.
    pub max_reflection_distance: f64,

    // Profile defaults
    pub default_ground_absorption: f64,
    pub default_elevation: f64,
    pub default_wall_absorption: f64,

    // Workers
    /// Number of worker threads. `None` uses rayon's default.
    pub threads: Option<usize>,
}

impl PropagationConfig {
    pub fn new() -> Self {
        let atmosphere = AtmosphericConditions::new();
        Self {
            band_set: BandSet::Octave,
            temperature: atmosphere.temperature,
            humidity: atmosphere.humidity,
            pressure: atmosphere.pressure,
            alpha_atmo: None,
            favourable_probability: 0.0,
            wind_rose: None,
            max_reflection_order: 0,
            horizontal_diffraction: false,
            vertical_diffraction: true,
            source_ground_factor: None,
            max_source_distance: 1200.0,
            max_reflection_distance: 50.0,
            default_ground_absorption: 0.0,
            default_elevation: 0.0,
            default_wall_absorption: 0.1,
            threads: None,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Failed to parse propagation config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json_str(&json)
    }

    pub fn atmosphere(&self) -> AtmosphericConditions {
        AtmosphericConditions {
            temperature: self.temperature,
            humidity: self.humidity,
            pressure: self.pressure,
        }
    }

    /// Fails with [`NoiseError::Config`] on any inconsistent setting.
    pub fn validate(&self) -> Result<()> {
        self.atmosphere().validate()?;
        if let Some(alpha) = &self.alpha_atmo
            && alpha.len() != self.band_set.len()
        {
            return Err(NoiseError::Config(format!(
                "alpha_atmo has {} values, {:?} needs {}",
                alpha.len(),
                self.band_set,
                self.band_set.len()
            ))
            .into());
        }
        self.favourable_conditions().validate()?;
        if let Some(gs) = self.source_ground_factor {
            check_fraction(gs, "source_ground_factor")?;
        }
        check_fraction(self.default_ground_absorption, "default_ground_absorption")?;
        check_fraction(self.default_wall_absorption, "default_wall_absorption")?;
        if !self.default_elevation.is_finite() {
            return Err(NoiseError::Config("default_elevation is not finite".to_string()).into());
        }
        for (name, value) in [
            ("max_source_distance", self.max_source_distance),
            ("max_reflection_distance", self.max_reflection_distance),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(NoiseError::Config(format!("{name} must be > 0, got {value}")).into());
            }
        }
        if self.threads == Some(0) {
            return Err(NoiseError::Config("threads must be >= 1".to_string()).into());
        }
        Ok(())
    }

    pub fn favourable_conditions(&self) -> FavourableConditions {
        match self.wind_rose {
            Some(rose) => FavourableConditions::WindRose(rose),
            None => FavourableConditions::Uniform(self.favourable_probability),
        }
    }

    pub fn path_options(&self) -> PathOptions {
        PathOptions {
            horizontal_diffraction: self.horizontal_diffraction,
            vertical_diffraction: self.vertical_diffraction,
            max_reflection_order: self.max_reflection_order,
            source_ground_factor: self.source_ground_factor,
            max_reflection_distance: self.max_reflection_distance,
        }
    }

    pub fn attenuation_calculator(&self) -> Result<AttenuationCalculator> {
        let calc = AttenuationCalculator::new(self.band_set, &self.atmosphere())?
            .with_favourable_conditions(self.favourable_conditions())?;
        match &self.alpha_atmo {
            Some(alpha) => calc.with_alpha_table(alpha.clone()),
            None => Ok(calc),
        }
    }

    /// Empty profile carrying the configured defaults.
    pub fn new_profile(&self) -> Result<Profile> {
        let mut profile = Profile::new();
        profile.set_default_ground_absorption(self.default_ground_absorption)?;
        profile.set_default_elevation(self.default_elevation)?;
        profile.set_default_wall_absorption(self.default_wall_absorption)?;
        Ok(profile)
    }
}

fn check_fraction(value: f64, name: &str) -> Result<()> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(NoiseError::Config(format!("{name} must be in [0, 1], got {value}")).into());
    }
    Ok(())
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PropagationConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.band_set, BandSet::Octave);
        assert_eq!(config.max_reflection_order, 0);
        assert!(config.vertical_diffraction);
        assert!(!config.horizontal_diffraction);
        assert!((config.temperature - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_partial_json() {
        let config = PropagationConfig::from_json_str(
            r#"{"band_set": "third_octave", "max_reflection_order": 2, "humidity": 50.0}"#,
        )
        .unwrap();
        assert_eq!(config.band_set, BandSet::ThirdOctave);
        assert_eq!(config.max_reflection_order, 2);
        assert_eq!(config.path_options().max_reflection_order, 2);
        assert!((config.max_source_distance - 1200.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_config() {
        let err = PropagationConfig::from_json_str(r#"{"alpha_atmo": [1.0, 2.0]}"#).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<NoiseError>(),
            Some(NoiseError::Config(_))
        ));
        let err =
            PropagationConfig::from_json_str(r#"{"default_ground_absorption": 2.0}"#).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<NoiseError>(),
            Some(NoiseError::Config(_))
        ));
        assert!(PropagationConfig::from_json_str("{not json").is_err());
    }

    #[test]
    fn test_favourable_settings() {
        let config = PropagationConfig::new();
        assert_eq!(config.favourable_conditions(), FavourableConditions::Uniform(0.0));

        let config = PropagationConfig::from_json_str(r#"{"favourable_probability": 0.5}"#).unwrap();
        assert_eq!(config.favourable_conditions(), FavourableConditions::Uniform(0.5));
        let calc = config.attenuation_calculator().unwrap();
        assert_eq!(calc.favourable_conditions(), &FavourableConditions::Uniform(0.5));

        let mut rose = vec![0.25; WIND_ROSE_SECTORS];
        rose[0] = 0.75;
        let json = format!(r#"{{"favourable_probability": 0.5, "wind_rose": {rose:?}}}"#);
        let config = PropagationConfig::from_json_str(&json).unwrap();
        match config.favourable_conditions() {
            FavourableConditions::WindRose(r) => assert_eq!(r.to_vec(), rose),
            other => panic!("unexpected conditions {other:?}"),
        }

        for json in [
            r#"{"favourable_probability": 1.2}"#,
            r#"{"wind_rose": [0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, -0.1]}"#,
        ] {
            let err = PropagationConfig::from_json_str(json).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<NoiseError>(),
                Some(NoiseError::Config(_))
            ));
        }
        // A rose needs all sixteen sectors
        assert!(PropagationConfig::from_json_str(r#"{"wind_rose": [0.5, 0.5]}"#).is_err());
    }

    #[test]
    fn test_new_profile_defaults() {
        let config = PropagationConfig {
            default_elevation: 3.0,
            ..PropagationConfig::new()
        };
        let mut profile = config.new_profile().unwrap();
        profile.finish_building();
        assert_eq!(profile.elevation_at(10.0, 10.0).unwrap(), 3.0);
    }
}
