//! Receiver levels from emission spectra and attenuated paths.

use anyhow::Result;
use serde::Serialize;

use crate::Point;
use crate::error::NoiseError;
use crate::sim::attenuation::AttenuationComponents;
use crate::sim::bands::{BandSet, SILENT_LEVEL_DB, Spectrum, db_to_w, w_to_db};
use crate::sim::paths::{PathKind, PropagationPath};

/// Hours and penalties (dB) of the day, evening and night periods.
const LDEN_PERIODS: [(f64, f64); 3] = [(12.0, 0.0), (4.0, 5.0), (8.0, 10.0)];

/// Level brought to a receiver by one path of one source.
#[derive(Debug, Clone)]
pub struct PathContribution {
    /// Index of the source in the batch.
    pub source: usize,
    pub path: PropagationPath,
    pub attenuation: AttenuationComponents,
    /// Sound pressure level per band at the receiver.
    pub spectrum: Spectrum,
}

impl PathContribution {
    pub fn kind(&self) -> PathKind {
        self.path.kind
    }
}

/// Levels at one receiver.
#[derive(Debug, Clone, Serialize)]
pub struct ReceiverResult {
    pub id: u64,
    pub position: Point,
    #[serde(skip)]
    pub contributions: Vec<PathContribution>,
    /// Energetic sum of all contributions per band.
    pub spectrum: Spectrum,
    /// A-weighted overall level in dB(A).
    pub laeq: f64,
}

/// Combines contributions into receiver levels for one band set.
#[derive(Debug, Clone, Copy)]
pub struct LevelAggregator {
    band_set: BandSet,
}

impl LevelAggregator {
    pub fn new(band_set: BandSet) -> Self {
        Self { band_set }
    }

    pub fn band_set(&self) -> BandSet {
        self.band_set
    }

    fn check(&self, actual: BandSet) -> Result<()> {
        if actual != self.band_set {
            return Err(NoiseError::BandSetMismatch {
                expected: self.band_set,
                actual,
            }
            .into());
        }
        Ok(())
    }

    /// Receiver level of one path: emission minus all attenuation terms.
    pub fn contribution(
        &self,
        source: usize,
        emission: &Spectrum,
        path: PropagationPath,
        attenuation: AttenuationComponents,
    ) -> Result<PathContribution> {
        self.check(emission.band_set())?;
        self.check(attenuation.band_set)?;
        let levels = emission
            .levels()
            .iter()
            .zip(attenuation.total())
            .map(|(l, a)| (l - a).max(SILENT_LEVEL_DB))
            .collect();
        Ok(PathContribution {
            source,
            path,
            attenuation,
            spectrum: Spectrum::new(self.band_set, levels)?,
        })
    }

    /// Energetic per-band sum. An empty list gives silence.
    pub fn sum_levels<'a>(&self, spectra: impl IntoIterator<Item = &'a Spectrum>) -> Result<Spectrum> {
        let mut power = vec![0.0; self.band_set.len()];
        for s in spectra {
            self.check(s.band_set())?;
            for (p, l) in power.iter_mut().zip(s.levels()) {
                *p += db_to_w(*l);
            }
        }
        Spectrum::new(self.band_set, power.into_iter().map(w_to_db).collect())
    }

    pub fn aggregate(
        &self,
        id: u64,
        position: Point,
        contributions: Vec<PathContribution>,
    ) -> Result<ReceiverResult> {
        let spectrum = self.sum_levels(contributions.iter().map(|c| &c.spectrum))?;
        let laeq = spectrum.a_weighted_total();
        Ok(ReceiverResult {
            id,
            position,
            contributions,
            spectrum,
            laeq,
        })
    }
}

/// Day-evening-night level from the three period levels.
pub fn lden(day: f64, evening: f64, night: f64) -> f64 {
    let weighted: f64 = [day, evening, night]
        .iter()
        .zip(LDEN_PERIODS)
        .map(|(l, (hours, penalty))| hours * db_to_w(l + penalty))
        .sum();
    w_to_db(weighted / 24.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::attenuation::{AtmosphericConditions, AttenuationCalculator};
    use crate::sim::paths::{GroundGeometry, PathEvent};

    fn path(length: f64) -> PropagationPath {
        PropagationPath {
            kind: PathKind::Direct,
            events: vec![
                PathEvent::Source(Point::new(0.0, 0.0, 1.0)),
                PathEvent::Receiver(Point::new(length, 0.0, 1.0)),
            ],
            length,
            direct_length: length,
            diffraction: None,
            ground: GroundGeometry {
                source_height: 1.0,
                receiver_height: 1.0,
                spans: vec![(length, 0.0)],
                source_ground_factor: None,
            },
        }
    }

    fn contribution(agg: &LevelAggregator, length: f64) -> PathContribution {
        let calc = AttenuationCalculator::new(agg.band_set(), &AtmosphericConditions::new()).unwrap();
        let p = path(length);
        let att = calc.score(&p).unwrap();
        agg.contribution(0, &Spectrum::uniform(agg.band_set(), 100.0), p, att)
            .unwrap()
    }

    #[test]
    fn test_identical_contributions_add_3db() {
        let agg = LevelAggregator::new(BandSet::Octave);
        let one = agg.aggregate(1, Point::new(0.0, 0.0, 0.0), vec![contribution(&agg, 40.0)]).unwrap();
        let two = agg
            .aggregate(
                1,
                Point::new(0.0, 0.0, 0.0),
                vec![contribution(&agg, 40.0), contribution(&agg, 40.0)],
            )
            .unwrap();
        for (a, b) in one.spectrum.levels().iter().zip(two.spectrum.levels()) {
            assert!((b - a - 10.0 * 2f64.log10()).abs() < 1e-9);
        }
        assert!((two.laeq - one.laeq - 10.0 * 2f64.log10()).abs() < 1e-9);
    }

    #[test]
    fn test_empty_is_silent() {
        let agg = LevelAggregator::new(BandSet::ThirdOctave);
        let res = agg.aggregate(7, Point::new(0.0, 0.0, 0.0), Vec::new()).unwrap();
        assert!(res.spectrum.levels().iter().all(|l| *l == SILENT_LEVEL_DB));
        assert!(res.laeq.is_finite());
    }

    #[test]
    fn test_band_set_mismatch() {
        let agg = LevelAggregator::new(BandSet::Octave);
        let p = path(10.0);
        let calc = AttenuationCalculator::new(BandSet::Octave, &AtmosphericConditions::new()).unwrap();
        let att = calc.score(&p).unwrap();
        let err = agg
            .contribution(0, &Spectrum::uniform(BandSet::ThirdOctave, 90.0), p, att)
            .unwrap_err();
        let err = err.downcast_ref::<NoiseError>().unwrap();
        assert!(err.is_fatal_for_batch());
    }

    #[test]
    fn test_lden() {
        // Same level in all periods: penalties add about 6.4 dB
        let l = lden(60.0, 60.0, 60.0);
        let expected = 60.0 + 10.0 * ((12.0 + 4.0 * 10f64.powf(0.5) + 8.0 * 10.0) / 24.0).log10();
        assert!((l - expected).abs() < 1e-9);
    }
}
