use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::NoiseError;
use crate::sim::bands::NUM_OCTAVE_BANDS;

use super::VehicleCategory;

/// Name of the virtual reference surface (no correction).
pub const REFERENCE_SURFACE: &str = "REF";

/// Road surface correction: `alpha(band) + beta * log10(v / 70)` on rolling noise.
///
/// Categories missing from the maps get no correction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoadSurface {
    #[serde(default)]
    pub alpha: BTreeMap<VehicleCategory, [f64; NUM_OCTAVE_BANDS]>,
    #[serde(default)]
    pub beta: BTreeMap<VehicleCategory, f64>,
    /// Speed range (km/h) the correction was fitted on.
    #[serde(default)]
    pub speed_range: Option<(f64, f64)>,
}

impl RoadSurface {
    pub fn alpha(&self, category: VehicleCategory, band: usize) -> f64 {
        self.alpha.get(&category).map(|a| a[band]).unwrap_or(0.0)
    }

    pub fn beta(&self, category: VehicleCategory) -> f64 {
        self.beta.get(&category).copied().unwrap_or(0.0)
    }

    pub fn is_valid_speed(&self, speed: f64) -> bool {
        match self.speed_range {
            Some((vmin, vmax)) => speed >= vmin && speed <= vmax,
            None => true,
        }
    }

    fn from_tables(
        light: [f64; NUM_OCTAVE_BANDS],
        heavy: [f64; NUM_OCTAVE_BANDS],
        beta: [f64; 3],
        speed_range: (f64, f64),
    ) -> Self {
        let alpha = BTreeMap::from([
            (VehicleCategory::Light, light),
            (VehicleCategory::Medium, heavy),
            (VehicleCategory::Heavy, heavy),
        ]);
        let beta = BTreeMap::from([
            (VehicleCategory::Light, beta[0]),
            (VehicleCategory::Medium, beta[1]),
            (VehicleCategory::Heavy, beta[2]),
        ]);
        Self {
            alpha,
            beta,
            speed_range: Some(speed_range),
        }
    }
}

/// Named road surfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoadSurfaceCatalog {
    surfaces: BTreeMap<String, RoadSurface>,
}

impl RoadSurfaceCatalog {
    /// Catalogue holding only the reference surface.
    pub fn reference() -> Self {
        let mut surfaces = BTreeMap::new();
        surfaces.insert(REFERENCE_SURFACE.to_string(), RoadSurface::default());
        Self { surfaces }
    }

    /// Reference surface plus the Dutch surfaces of the CNOSSOS-EU catalogue.
    pub fn cnossos() -> Self {
        let mut catalog = Self::reference();
        catalog.insert(
            "NL01",
            RoadSurface::from_tables(
                [0.5, 3.3, 2.4, 3.2, -1.3, -3.5, -2.6, 0.5],
                [0.9, 1.4, 1.8, -0.4, -5.2, -4.6, -3.0, -1.4],
                [-6.5, 0.2, 0.2],
                (50.0, 130.0),
            ),
        );
        catalog.insert(
            "NL02",
            RoadSurface::from_tables(
                [0.4, 2.4, 0.2, -3.1, -4.2, -6.3, -4.8, -2.0],
                [0.4, 0.2, -0.7, -5.4, -6.3, -6.3, -4.7, -3.7],
                [-3.0, 4.7, 4.7],
                (50.0, 130.0),
            ),
        );
        catalog.insert(
            "NL03",
            RoadSurface::from_tables(
                [-1.0, 1.7, -1.5, -5.3, -6.3, -8.5, -5.3, -2.4],
                [1.0, 0.1, -1.8, -5.9, -6.1, -6.7, -4.8, -3.8],
                [-0.1, -0.8, -0.8],
                (80.0, 130.0),
            ),
        );
        catalog.insert(
            "NL04",
            RoadSurface::from_tables(
                [1.1, -1.0, 0.2, 1.3, -1.9, -2.8, -2.1, -1.4],
                [0.0; NUM_OCTAVE_BANDS],
                [-1.0, 0.0, 0.0],
                (40.0, 80.0),
            ),
        );
        catalog.insert(
            "NL05",
            RoadSurface::from_tables(
                [0.3, 0.0, 0.0, -0.1, -0.7, -1.3, -0.8, -0.8],
                [0.0; NUM_OCTAVE_BANDS],
                [-1.0, 0.0, 0.0],
                (40.0, 80.0),
            ),
        );
        catalog
    }

    /// Parses a JSON object mapping surface names to corrections.
    ///
    /// The reference surface is added if the document does not define it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut catalog: Self =
            serde_json::from_str(json).context("Failed to parse road surface catalogue")?;
        catalog
            .surfaces
            .entry(REFERENCE_SURFACE.to_string())
            .or_default();
        Ok(catalog)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json_str(&json)
    }

    pub fn insert(&mut self, name: &str, surface: RoadSurface) {
        self.surfaces.insert(name.to_string(), surface);
    }

    pub fn get(&self, name: &str) -> Result<&RoadSurface> {
        self.surfaces
            .get(name)
            .ok_or_else(|| NoiseError::UnknownRoadSurface(name.to_string()).into())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.surfaces.keys().map(|s| s.as_str())
    }
}

impl Default for RoadSurfaceCatalog {
    fn default() -> Self {
        Self::cnossos()
    }
}
