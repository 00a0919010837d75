//! CNOSSOS-EU road vehicle coefficients per octave band (63 Hz to 8 kHz).

use crate::sim::bands::NUM_OCTAVE_BANDS;

use super::{JunctionType, VehicleCategory};

type Bands = [f64; NUM_OCTAVE_BANDS];

/// Reference speed of the emission laws in km/h.
pub const REFERENCE_SPEED: f64 = 70.0;

/// Reference temperature of the rolling noise law in degC.
pub const REFERENCE_TEMPERATURE: f64 = 20.0;

/// Rolling noise (`A_R`, `B_R`) and propulsion noise (`A_P`, `B_P`) coefficients.
pub struct VehicleCoefficients {
    pub rolling: Option<(Bands, Bands)>,
    pub propulsion: (Bands, Bands),
}

const LIGHT: VehicleCoefficients = VehicleCoefficients {
    rolling: Some((
        [79.7, 85.7, 84.5, 90.2, 97.3, 93.9, 84.1, 74.3],
        [30.0, 41.5, 38.9, 25.7, 32.5, 37.2, 39.0, 40.0],
    )),
    propulsion: (
        [94.5, 89.2, 88.0, 85.9, 84.2, 86.9, 83.3, 76.1],
        [-1.3, 7.2, 7.7, 8.0, 8.0, 8.0, 8.0, 8.0],
    ),
};

const MEDIUM: VehicleCoefficients = VehicleCoefficients {
    rolling: Some((
        [84.0, 88.7, 91.5, 96.7, 97.4, 90.9, 83.8, 80.5],
        [30.0, 35.8, 32.6, 23.8, 30.1, 36.2, 38.3, 40.1],
    )),
    propulsion: (
        [101.0, 96.5, 98.8, 96.8, 98.6, 95.2, 88.8, 82.7],
        [-1.9, 4.7, 6.4, 6.5, 6.5, 6.5, 6.5, 6.5],
    ),
};

const HEAVY: VehicleCoefficients = VehicleCoefficients {
    rolling: Some((
        [87.0, 91.7, 94.1, 100.7, 100.8, 94.3, 87.1, 82.5],
        [30.0, 33.5, 31.3, 25.4, 31.8, 37.1, 38.6, 40.6],
    )),
    propulsion: (
        [104.4, 100.6, 101.7, 101.0, 100.1, 95.9, 91.3, 85.3],
        [0.0, 3.0, 4.6, 5.0, 5.0, 5.0, 5.0, 5.0],
    ),
};

// Two-wheelers only have a propulsion component
const LIGHT_TWO_WHEELER: VehicleCoefficients = VehicleCoefficients {
    rolling: None,
    propulsion: (
        [88.0, 87.5, 89.5, 93.7, 96.6, 98.8, 93.9, 88.7],
        [4.2, 7.4, 9.8, 11.6, 15.7, 18.9, 20.3, 20.6],
    ),
};

const HEAVY_TWO_WHEELER: VehicleCoefficients = VehicleCoefficients {
    rolling: None,
    propulsion: (
        [95.0, 97.2, 92.7, 92.9, 94.7, 93.2, 90.1, 86.5],
        [3.2, 5.9, 11.9, 11.6, 11.5, 12.6, 11.1, 12.0],
    ),
};

/// Studded tyre coefficients (`a`, `b`), light vehicles only.
pub const STUDDED_TYRES: (Bands, Bands) = (
    [0.0, 0.0, 0.0, 2.6, 2.9, 1.5, 2.3, 9.2],
    [0.0, 0.0, 0.0, -3.1, -6.4, -14.0, -22.4, -11.4],
);

pub fn vehicle_coefficients(category: VehicleCategory) -> &'static VehicleCoefficients {
    match category {
        VehicleCategory::Light => &LIGHT,
        VehicleCategory::Medium => &MEDIUM,
        VehicleCategory::Heavy => &HEAVY,
        VehicleCategory::LightTwoWheeler => &LIGHT_TWO_WHEELER,
        VehicleCategory::HeavyTwoWheeler => &HEAVY_TWO_WHEELER,
    }
}

/// Temperature coefficient `K` of the rolling noise correction `K * (20 - T)`.
pub fn temperature_coefficient(category: VehicleCategory) -> f64 {
    match category {
        VehicleCategory::Light => 0.08,
        VehicleCategory::Medium | VehicleCategory::Heavy => 0.04,
        VehicleCategory::LightTwoWheeler | VehicleCategory::HeavyTwoWheeler => 0.0,
    }
}

/// Acceleration coefficients (`C_R`, `C_P`) near a junction.
pub fn junction_coefficients(category: VehicleCategory, junction: JunctionType) -> (f64, f64) {
    use VehicleCategory::*;
    match (junction, category) {
        (JunctionType::None, _) => (0.0, 0.0),
        (_, LightTwoWheeler | HeavyTwoWheeler) => (0.0, 0.0),
        (JunctionType::TrafficLight, Light) => (-4.5, 5.5),
        (JunctionType::TrafficLight, Medium | Heavy) => (-4.0, 9.0),
        (JunctionType::Roundabout, Light) => (-4.4, 3.1),
        (JunctionType::Roundabout, Medium | Heavy) => (-2.3, 6.7),
    }
}

/// Propulsion noise correction for a road gradient in percent.
///
/// Positive slopes go uphill in the direction of travel.
pub fn slope_correction(category: VehicleCategory, speed: f64, slope: f64) -> f64 {
    match category {
        VehicleCategory::Light => {
            if slope < -6.0 {
                (-slope).min(12.0) - 6.0
            } else if slope <= 2.0 {
                0.0
            } else {
                speed / 100.0 * (slope.min(12.0) - 2.0) / 1.5
            }
        }
        VehicleCategory::Medium => {
            if slope < -4.0 {
                (speed - 20.0) / 100.0 * ((-slope).min(12.0) - 4.0) / 0.7
            } else if slope <= 0.0 {
                0.0
            } else {
                speed / 100.0 * slope.min(12.0)
            }
        }
        VehicleCategory::Heavy => {
            if slope < -4.0 {
                (speed - 10.0) / 100.0 * ((-slope).min(12.0) - 4.0) / 0.5
            } else if slope <= 0.0 {
                0.0
            } else {
                speed / 100.0 * slope.min(12.0) / 0.8
            }
        }
        VehicleCategory::LightTwoWheeler | VehicleCategory::HeavyTwoWheeler => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slope_correction() {
        // Flat or gentle slopes: no correction
        assert_eq!(slope_correction(VehicleCategory::Light, 50.0, 1.0), 0.0);
        assert_eq!(slope_correction(VehicleCategory::Heavy, 50.0, -3.0), 0.0);
        // Uphill light vehicle at 90 km/h, 8 %
        let c = slope_correction(VehicleCategory::Light, 90.0, 8.0);
        assert!((c - 0.9 * 6.0 / 1.5).abs() < 1e-12);
        // Steep downhill capped at 12 %
        let c = slope_correction(VehicleCategory::Light, 90.0, -20.0);
        assert!((c - 6.0).abs() < 1e-12);
        // Heavy uphill grows faster than medium
        assert!(
            slope_correction(VehicleCategory::Heavy, 80.0, 5.0)
                > slope_correction(VehicleCategory::Medium, 80.0, 5.0)
        );
    }

    #[test]
    fn test_junction_coefficients() {
        assert_eq!(
            junction_coefficients(VehicleCategory::Light, JunctionType::TrafficLight),
            (-4.5, 5.5)
        );
        assert_eq!(
            junction_coefficients(VehicleCategory::Heavy, JunctionType::Roundabout),
            (-2.3, 6.7)
        );
        assert_eq!(
            junction_coefficients(VehicleCategory::LightTwoWheeler, JunctionType::TrafficLight),
            (0.0, 0.0)
        );
        assert_eq!(
            junction_coefficients(VehicleCategory::Medium, JunctionType::None),
            (0.0, 0.0)
        );
    }
}
