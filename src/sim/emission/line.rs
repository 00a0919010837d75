use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::NoiseError;
use crate::sim::profile::Profile;
use crate::{Point, Spectrum};

/// Omnidirectional point source with a sound power spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSource {
    pub position: Point,
    pub spectrum: Spectrum,
}

impl PointSource {
    pub fn new(position: Point, spectrum: Spectrum) -> Self {
        Self { position, spectrum }
    }
}

/// Road axis carrying a sound power spectrum per metre of road.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSource {
    points: Vec<Point>,
    spectrum: Spectrum,
    source_height: f64,
}

impl LineSource {
    /// `spectrum` is in dB/m (see `EmissionUnit::PerMetre`).
    /// Only the planar coordinates of `points` are used.
    pub fn new(points: Vec<Point>, spectrum: Spectrum, source_height: f64) -> Result<Self> {
        if points.len() < 2 {
            return Err(NoiseError::Validation(format!(
                "line source needs at least 2 points, got {}",
                points.len()
            ))
            .into());
        }
        if points.iter().any(|p| !p.is_finite()) || !source_height.is_finite() {
            return Err(
                NoiseError::Validation("line source has non-finite coordinates".to_string()).into(),
            );
        }
        Ok(Self {
            points,
            spectrum,
            source_height,
        })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn spectrum(&self) -> &Spectrum {
        &self.spectrum
    }

    /// Planar length of the polyline.
    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| w[0].distance_2d(&w[1]))
            .sum()
    }

    /// Splits the line into point sources no more than `step` metres apart.
    ///
    /// Each polyline segment is cut into equal parts. A point source sits at
    /// the middle of each part, `source_height` above the terrain, and carries
    /// the power of the whole part.
    pub fn discretize(&self, step: f64, profile: &Profile) -> Result<Vec<PointSource>> {
        if !step.is_finite() || step <= 0.0 {
            return Err(NoiseError::Validation(format!(
                "discretization step must be > 0, got {step}"
            ))
            .into());
        }
        let mut sources = Vec::new();
        for w in self.points.windows(2) {
            let length = w[0].distance_2d(&w[1]);
            if length <= 0.0 {
                continue;
            }
            let parts = (length / step).ceil().max(1.0) as usize;
            let part_length = length / parts as f64;
            let spectrum = self.spectrum.offset(10.0 * part_length.log10());
            for k in 0..parts {
                let t = (k as f64 + 0.5) / parts as f64;
                let p = Point::lerp(w[0], w[1], t);
                let z = profile.elevation_at(p.x, p.y)? + self.source_height;
                sources.push(PointSource::new(p.with_z(z), spectrum.clone()));
            }
        }
        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::bands::{BandSet, sum_db};

    #[test]
    fn test_discretize_conserves_power() {
        let mut profile = Profile::new();
        profile.set_default_elevation(2.0).unwrap();
        profile.finish_building();

        let line = LineSource::new(
            vec![
                Point::new(0.0, 0.0, 0.0),
                Point::new(25.0, 0.0, 0.0),
                Point::new(25.0, 10.0, 0.0),
            ],
            Spectrum::uniform(BandSet::Octave, 60.0),
            0.05,
        )
        .unwrap();
        let sources = line.discretize(10.0, &profile).unwrap();
        // 3 parts on the first segment, 1 on the second
        assert_eq!(sources.len(), 4);
        assert!((sources[0].position.x - 25.0 / 6.0).abs() < 1e-9);
        assert!((sources[0].position.z - 2.05).abs() < 1e-12);

        let total = sum_db(sources.iter().map(|s| s.spectrum.levels()[0]));
        let expected = 60.0 + 10.0 * line.length().log10();
        assert!((total - expected).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_line() {
        let spectrum = Spectrum::uniform(BandSet::Octave, 60.0);
        assert!(LineSource::new(vec![Point::new(0.0, 0.0, 0.0)], spectrum.clone(), 0.05).is_err());

        let line = LineSource::new(
            vec![Point::new(0.0, 0.0, 0.0), Point::new(1.0, 0.0, 0.0)],
            spectrum,
            0.05,
        )
        .unwrap();
        let mut profile = Profile::new();
        profile.finish_building();
        assert!(line.discretize(0.0, &profile).is_err());
    }
}
