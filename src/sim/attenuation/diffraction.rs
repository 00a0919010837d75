//! Diffraction loss from the path length difference.

use crate::sim::paths::DiffractionGeometry;

/// Upper bound of the diffraction loss in dB.
pub const MAX_DIFFRACTION_DB: f64 = 25.0;

/// Edges closer than this count as a single edge.
const MIN_EDGE_SPACING: f64 = 0.3;

/// Multiple-edge factor `C''`.
fn multiple_edge_factor(wavelength: f64, e: f64) -> f64 {
    if e > MIN_EDGE_SPACING {
        let r = (5.0 * wavelength / e).powi(2);
        (1.0 + r) / (1.0 / 3.0 + r)
    } else {
        1.0
    }
}

/// Diffraction loss in dB at one wavelength.
///
/// Zero for `delta <= 0`, rises with `delta` and frequency, capped at
/// [`MAX_DIFFRACTION_DB`].
pub fn diffraction_loss(geometry: &DiffractionGeometry, wavelength: f64) -> f64 {
    loss(geometry.delta, geometry.e, wavelength)
}

/// Diffraction loss in dB along curved rays, from the favourable path difference.
pub fn favourable_diffraction_loss(geometry: &DiffractionGeometry, wavelength: f64) -> f64 {
    loss(geometry.favourable_delta, geometry.e, wavelength)
}

fn loss(delta: f64, e: f64, wavelength: f64) -> f64 {
    if delta <= 0.0 {
        return 0.0;
    }
    let c = multiple_edge_factor(wavelength, e);
    (10.0 * (3.0 + 40.0 / wavelength * c * delta).log10()).min(MAX_DIFFRACTION_DB)
}
