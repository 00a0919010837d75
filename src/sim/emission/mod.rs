//! Road traffic sound power emission (CNOSSOS-EU road model).

mod coefficients;
mod line;
mod surface;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{NoiseError, check_unit_interval};
use crate::sim::bands::{BandSet, NUM_OCTAVE_BANDS, SILENT_LEVEL_DB, Spectrum, db_to_w, w_to_db};

pub use coefficients::{REFERENCE_SPEED, REFERENCE_TEMPERATURE};
pub use line::{LineSource, PointSource};
pub use surface::{REFERENCE_SURFACE, RoadSurface, RoadSurfaceCatalog};

use coefficients::{
    STUDDED_TYRES, junction_coefficients, slope_correction, temperature_coefficient,
    vehicle_coefficients,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleCategory {
    /// Category 1: passenger cars, vans < 3.5 t.
    Light,
    /// Category 2: medium heavy vehicles, 2 axles.
    Medium,
    /// Category 3: heavy vehicles, 3 or more axles.
    Heavy,
    /// Category 4a: mopeds, tricycles and quads <= 50 cc.
    LightTwoWheeler,
    /// Category 4b: motorcycles > 50 cc.
    HeavyTwoWheeler,
}

impl VehicleCategory {
    pub const ALL: [VehicleCategory; 5] = [
        Self::Light,
        Self::Medium,
        Self::Heavy,
        Self::LightTwoWheeler,
        Self::HeavyTwoWheeler,
    ];
}

/// Traffic of one vehicle category on a road segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleFlow {
    pub category: VehicleCategory,
    /// Mean speed in km/h.
    pub speed: f64,
    /// Vehicles per hour.
    pub count: f64,
}

impl VehicleFlow {
    pub fn new(category: VehicleCategory, speed: f64, count: f64) -> Result<Self> {
        let flow = Self {
            category,
            speed,
            count,
        };
        flow.validate()?;
        Ok(flow)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(NoiseError::Validation(format!(
                "vehicle speed must be > 0 km/h, got {}",
                self.speed
            ))
            .into());
        }
        if !self.count.is_finite() || self.count < 0.0 {
            return Err(NoiseError::Validation(format!(
                "hourly vehicle count must be >= 0, got {}",
                self.count
            ))
            .into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JunctionType {
    #[default]
    None,
    TrafficLight,
    /// Roundabout or stop sign.
    Roundabout,
}

/// Traffic direction relative to the digitization of the road.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Way {
    /// Traffic follows the road geometry; the slope applies as given.
    #[default]
    Direct,
    /// Traffic goes against the geometry; the slope is reversed.
    Inverse,
    /// Half of the flow in each direction.
    TwoWay,
}

/// What the emission level is normalized to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionUnit {
    /// Sound power of the whole hourly flow, `+ 10 log10(Q)`.
    #[default]
    PerVehicleFlow,
    /// Sound power per metre of road, `+ 10 log10(Q / (1000 v))`.
    PerMetre,
}

/// Road and weather parameters shared by all flows of a road segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadSegmentContext {
    /// Name of the road surface in the catalogue.
    pub surface: String,
    /// Mean air temperature in degC.
    pub temperature: f64,
    /// Share of light vehicles with studded tyres during the period, in [0, 1].
    pub studded_ratio: f64,
    /// Days per year studded tyres are in use.
    pub studded_days: f64,
    /// Distance to the nearest junction in metres.
    pub junction_distance: f64,
    pub junction: JunctionType,
    /// Longitudinal slope in percent.
    pub slope: f64,
    pub way: Way,
    /// Height of the equivalent source above the road surface in metres.
    pub source_height: f64,
}

impl RoadSegmentContext {
    pub fn new() -> Self {
        Self {
            surface: REFERENCE_SURFACE.to_string(),
            temperature: REFERENCE_TEMPERATURE,
            studded_ratio: 0.0,
            studded_days: 0.0,
            junction_distance: 250.0,
            junction: JunctionType::None,
            slope: 0.0,
            way: Way::Direct,
            source_height: 0.05,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.temperature.is_finite() || !self.slope.is_finite() {
            return Err(NoiseError::Validation(
                "temperature and slope must be finite".to_string(),
            )
            .into());
        }
        check_unit_interval(self.studded_ratio, "studded tyre ratio")?;
        if !(0.0..=365.0).contains(&self.studded_days) {
            return Err(NoiseError::Validation(format!(
                "studded tyre period must be in [0, 365] days, got {}",
                self.studded_days
            ))
            .into());
        }
        if !self.junction_distance.is_finite() || self.junction_distance < 0.0 {
            return Err(NoiseError::Validation(format!(
                "junction distance must be >= 0, got {}",
                self.junction_distance
            ))
            .into());
        }
        if !self.source_height.is_finite() || self.source_height < 0.0 {
            return Err(NoiseError::Validation(format!(
                "source height must be >= 0, got {}",
                self.source_height
            ))
            .into());
        }
        Ok(())
    }
}

impl Default for RoadSegmentContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Computes per-band sound power levels of road traffic.
#[derive(Debug, Clone)]
pub struct EmissionModel {
    band_set: BandSet,
    unit: EmissionUnit,
    surfaces: RoadSurfaceCatalog,
}

impl EmissionModel {
    pub fn new(band_set: BandSet) -> Self {
        Self {
            band_set,
            unit: EmissionUnit::default(),
            surfaces: RoadSurfaceCatalog::default(),
        }
    }

    pub fn with_unit(mut self, unit: EmissionUnit) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_surfaces(mut self, surfaces: RoadSurfaceCatalog) -> Self {
        self.surfaces = surfaces;
        self
    }

    pub fn band_set(&self) -> BandSet {
        self.band_set
    }

    pub fn unit(&self) -> EmissionUnit {
        self.unit
    }

    /// Emission spectrum of one vehicle flow.
    pub fn evaluate(&self, flow: &VehicleFlow, ctx: &RoadSegmentContext) -> Result<Spectrum> {
        flow.validate()?;
        ctx.validate()?;
        let surface = self.surfaces.get(&ctx.surface)?;
        if !surface.is_valid_speed(flow.speed) {
            debug!(
                surface = %ctx.surface,
                speed = flow.speed,
                "Speed outside the validity range of the road surface"
            );
        }

        if flow.count <= 0.0 {
            return Ok(Spectrum::silent(self.band_set));
        }

        let flow_offset = match self.unit {
            EmissionUnit::PerVehicleFlow => 10.0 * flow.count.log10(),
            EmissionUnit::PerMetre => 10.0 * (flow.count / (1000.0 * flow.speed)).log10(),
        };

        let mut octave = [0.0; NUM_OCTAVE_BANDS];
        for (band, level) in octave.iter_mut().enumerate() {
            let power = match ctx.way {
                Way::Direct => db_to_w(unit_level(flow, ctx, surface, band, ctx.slope)),
                Way::Inverse => db_to_w(unit_level(flow, ctx, surface, band, -ctx.slope)),
                Way::TwoWay => {
                    0.5 * (db_to_w(unit_level(flow, ctx, surface, band, ctx.slope))
                        + db_to_w(unit_level(flow, ctx, surface, band, -ctx.slope)))
                }
            };
            *level = (w_to_db(power) + flow_offset).max(SILENT_LEVEL_DB);
        }

        let levels = match self.band_set {
            BandSet::Octave => octave.to_vec(),
            BandSet::ThirdOctave => {
                let split = 10.0 * 3f64.log10();
                (0..self.band_set.len())
                    .map(|i| (octave[self.band_set.parent_octave(i)] - split).max(SILENT_LEVEL_DB))
                    .collect()
            }
        };
        Spectrum::new(self.band_set, levels)
    }

    /// Combined emission spectrum of several flows on the same road segment.
    pub fn evaluate_all(&self, flows: &[VehicleFlow], ctx: &RoadSegmentContext) -> Result<Spectrum> {
        if flows.is_empty() {
            return Ok(Spectrum::silent(self.band_set));
        }
        let spectra = flows
            .iter()
            .map(|f| self.evaluate(f, ctx))
            .collect::<Result<Vec<_>>>()?;
        Self::combine(&spectra)
    }

    /// Energetic per-band sum of spectra.
    pub fn combine(spectra: &[Spectrum]) -> Result<Spectrum> {
        Spectrum::sum(spectra)
    }
}

/// Level of a single vehicle per hour in one octave band, rolling and propulsion combined.
fn unit_level(
    flow: &VehicleFlow,
    ctx: &RoadSegmentContext,
    surface: &RoadSurface,
    band: usize,
    slope: f64,
) -> f64 {
    let category = flow.category;
    let v = flow.speed;
    let log_speed = (v / REFERENCE_SPEED).log10();
    let coeffs = vehicle_coefficients(category);
    let (cr, cp) = junction_coefficients(category, ctx.junction);
    let junction_factor = (1.0 - ctx.junction_distance.abs() / 100.0).max(0.0);
    let alpha = surface.alpha(category, band);

    let rolling = coeffs.rolling.map(|(ar, br)| {
        let mut lr = ar[band] + br[band] * log_speed;
        lr += temperature_coefficient(category) * (REFERENCE_TEMPERATURE - ctx.temperature);
        lr += cr * junction_factor;
        if category == VehicleCategory::Light && ctx.studded_ratio > 0.0 && ctx.studded_days > 0.0
        {
            lr += studded_tyre_correction(v, ctx.studded_ratio, ctx.studded_days, band);
        }
        lr + alpha + surface.beta(category) * log_speed
    });

    let (ap, bp) = coeffs.propulsion;
    let mut lp = ap[band] + bp[band] * ((v - REFERENCE_SPEED) / REFERENCE_SPEED).max(0.0);
    lp += cp * junction_factor;
    lp += slope_correction(category, v, slope);
    lp += alpha.min(0.0);

    match rolling {
        Some(lr) => w_to_db(db_to_w(lr) + db_to_w(lp)),
        None => lp,
    }
}

fn studded_tyre_correction(speed: f64, ratio: f64, days: f64, band: usize) -> f64 {
    let v = speed.clamp(50.0, 90.0);
    let (a, b) = STUDDED_TYRES;
    let delta = a[band] + b[band] * (v / REFERENCE_SPEED).log10();
    let ps = ratio * days / 365.0;
    10.0 * ((1.0 - ps) + ps * db_to_w(delta)).log10()
}
