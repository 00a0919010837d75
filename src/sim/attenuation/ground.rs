//! Ground effect (ISO 9613-2 general method).

use crate::geom::EPS;
use crate::sim::bands::BandSet;
use crate::sim::paths::GroundGeometry;
use crate::sim::profile::mean_g;

/// Ground regions near the source and the receiver extend over this many
/// times the respective height.
const REGION_FACTOR: f64 = 30.0;

/// Curvature coefficient of favourable rays, in 1/m.
const CURVATURE_COEFF: f64 = 2e-4;

/// Height allowance per metre of distance for the terrain roughness.
const ROUGHNESS_SLOPE: f64 = 6e-3;

/// Region term `A_s` or `A_r` in one octave band.
fn region_term(octave: usize, g: f64, h: f64, dp: f64) -> f64 {
    let far = 1.0 - (-dp / 50.0).exp();
    match octave {
        0 => -1.5,
        1 => {
            let a = 1.5
                + 3.0 * (-0.12 * (h - 5.0).powi(2)).exp() * far
                + 5.7 * (-0.09 * h * h).exp() * (1.0 - (-2.8e-6 * dp * dp).exp());
            -1.5 + g * a
        }
        2 => -1.5 + g * (1.5 + 8.6 * (-0.09 * h * h).exp() * far),
        3 => -1.5 + g * (1.5 + 14.0 * (-0.46 * h * h).exp() * far),
        4 => -1.5 + g * (1.5 + 5.0 * (-0.9 * h * h).exp() * far),
        _ => -1.5 * (1.0 - g),
    }
}

/// Middle region term `A_m` in one octave band.
fn middle_term(octave: usize, gm: f64, hs: f64, hr: f64, dp: f64) -> f64 {
    let limit = REGION_FACTOR * (hs + hr);
    let q = if dp <= limit { 0.0 } else { 1.0 - limit / dp };
    if octave == 0 { -3.0 * q } else { -3.0 * q * (1.0 - gm) }
}

/// Mean ground factors of the source, middle and receiver regions.
pub fn region_factors(ground: &GroundGeometry) -> (f64, f64, f64) {
    let dp = ground.projected_length();
    let source_end = (REGION_FACTOR * ground.source_height).min(dp);
    let receiver_start = (dp - REGION_FACTOR * ground.receiver_height).max(0.0);
    let mean = |from: f64, to: f64| mean_g(&ground.spans, from, to);

    let gs = match ground.source_ground_factor {
        Some(g) => g,
        None => mean(0.0, source_end).or_else(|| mean(0.0, dp)).unwrap_or(0.0),
    };
    let gr = mean(receiver_start, dp).or_else(|| mean(0.0, dp)).unwrap_or(0.0);
    let gm = mean(source_end, receiver_start)
        .or_else(|| mean(0.0, dp))
        .unwrap_or(0.0);
    (gs, gm, gr)
}

/// Equivalent source and receiver heights under downward-refracting
/// conditions: the real heights raised by the ray curvature and by the
/// terrain roughness allowance.
pub fn favourable_heights(ground: &GroundGeometry) -> (f64, f64) {
    let (hs, hr) = (ground.source_height, ground.receiver_height);
    let sum = hs + hr;
    if sum < EPS {
        return (hs, hr);
    }
    let dp = ground.projected_length();
    let rough = ROUGHNESS_SLOPE * dp / sum;
    let raise = |h: f64| CURVATURE_COEFF * (h / sum).powi(2) * dp * dp / 2.0;
    (hs + raise(hs) + rough, hr + raise(hr) + rough)
}

/// Ground attenuation per band in dB under homogeneous conditions, never negative.
pub fn ground_attenuation(ground: &GroundGeometry, band_set: BandSet) -> Vec<f64> {
    attenuation_at_heights(
        ground,
        band_set,
        ground.source_height,
        ground.receiver_height,
    )
}

/// Ground attenuation per band in dB under favourable conditions, never negative.
pub fn favourable_ground_attenuation(ground: &GroundGeometry, band_set: BandSet) -> Vec<f64> {
    let (hs, hr) = favourable_heights(ground);
    attenuation_at_heights(ground, band_set, hs, hr)
}

/// Region extents come from the real heights, the terms from `hs` and `hr`.
fn attenuation_at_heights(ground: &GroundGeometry, band_set: BandSet, hs: f64, hr: f64) -> Vec<f64> {
    let dp = ground.projected_length();
    let (gs, gm, gr) = region_factors(ground);
    (0..band_set.len())
        .map(|band| {
            let octave = match band_set {
                BandSet::Octave => band,
                BandSet::ThirdOctave => band_set.parent_octave(band),
            };
            let total = region_term(octave, gs, hs, dp)
                + region_term(octave, gr, hr, dp)
                + middle_term(octave, gm, hs, hr, dp);
            total.max(0.0)
        })
        .collect()
}
