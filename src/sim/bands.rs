//! Frequency band sets, spectra and decibel arithmetic.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::NoiseError;

/// Level used in place of "no sound at all", keeping every output finite.
pub const SILENT_LEVEL_DB: f64 = -99.0;

/// Number of octave bands (63 Hz to 8 kHz).
pub const NUM_OCTAVE_BANDS: usize = 8;

/// Number of third-octave bands (100 Hz to 5 kHz).
pub const NUM_THIRD_OCTAVE_BANDS: usize = 18;

/// Nominal center frequencies of the octave bands in Hz.
pub const OCTAVE_BAND_FREQUENCIES: [f64; NUM_OCTAVE_BANDS] =
    [63.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0];

/// Nominal center frequencies of the third-octave bands in Hz.
pub const THIRD_OCTAVE_BAND_FREQUENCIES: [f64; NUM_THIRD_OCTAVE_BANDS] = [
    100.0, 125.0, 160.0, 200.0, 250.0, 315.0, 400.0, 500.0, 630.0, 800.0, 1000.0, 1250.0, 1600.0,
    2000.0, 2500.0, 3150.0, 4000.0, 5000.0,
];

/// A-weighting per octave band (IEC 61672-1).
pub const OCTAVE_A_WEIGHTING: [f64; NUM_OCTAVE_BANDS] =
    [-26.2, -16.1, -8.6, -3.2, 0.0, 1.2, 1.0, -1.1];

/// A-weighting per third-octave band (IEC 61672-1).
pub const THIRD_OCTAVE_A_WEIGHTING: [f64; NUM_THIRD_OCTAVE_BANDS] = [
    -19.1, -16.1, -13.4, -10.9, -8.6, -6.6, -4.8, -3.2, -1.9, -0.8, 0.0, 0.6, 1.0, 1.2, 1.3, 1.2,
    1.0, 0.5,
];

/// Frequency resolution used for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandSet {
    /// 8 octave bands, 63 Hz to 8 kHz.
    #[default]
    Octave,
    /// 18 third-octave bands, 100 Hz to 5 kHz.
    ThirdOctave,
}

impl BandSet {
    pub fn len(&self) -> usize {
        match self {
            Self::Octave => NUM_OCTAVE_BANDS,
            Self::ThirdOctave => NUM_THIRD_OCTAVE_BANDS,
        }
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Nominal center frequencies in Hz.
    pub fn frequencies(&self) -> &'static [f64] {
        match self {
            Self::Octave => &OCTAVE_BAND_FREQUENCIES,
            Self::ThirdOctave => &THIRD_OCTAVE_BAND_FREQUENCIES,
        }
    }

    /// Exact mid-band frequencies `1000 * 10^(n/10)` in Hz.
    pub fn exact_frequencies(&self) -> Vec<f64> {
        let (first, step) = match self {
            Self::Octave => (-12, 3),
            Self::ThirdOctave => (-10, 1),
        };
        (0..self.len())
            .map(|i| 1000.0 * 10f64.powf((first + step * i as i32) as f64 / 10.0))
            .collect()
    }

    /// A-weighting offsets in dB.
    pub fn a_weighting(&self) -> &'static [f64] {
        match self {
            Self::Octave => &OCTAVE_A_WEIGHTING,
            Self::ThirdOctave => &THIRD_OCTAVE_A_WEIGHTING,
        }
    }

    /// Index of the octave band containing band `i`.
    pub fn parent_octave(&self, i: usize) -> usize {
        match self {
            Self::Octave => i,
            Self::ThirdOctave => 1 + i / 3,
        }
    }

    /// Wavelength in metres of every band for a given sound speed.
    pub fn wavelengths(&self, celerity: f64) -> Vec<f64> {
        self.exact_frequencies()
            .iter()
            .map(|f| celerity / f)
            .collect()
    }
}

/// Converts a level in dB to relative power.
pub fn db_to_w(db: f64) -> f64 {
    10f64.powf(db / 10.0)
}

/// Converts relative power to dB, floored at [`SILENT_LEVEL_DB`].
pub fn w_to_db(w: f64) -> f64 {
    if w > 0.0 && w.is_finite() {
        (10.0 * w.log10()).max(SILENT_LEVEL_DB)
    } else {
        SILENT_LEVEL_DB
    }
}

/// Energetic sum of levels: `10 log10(sum 10^(L/10))`.
pub fn sum_db(levels: impl IntoIterator<Item = f64>) -> f64 {
    w_to_db(levels.into_iter().map(db_to_w).sum())
}

/// Per-band levels in dB tied to the band set they were computed for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    band_set: BandSet,
    levels: Vec<f64>,
}

impl Spectrum {
    pub fn new(band_set: BandSet, levels: Vec<f64>) -> Result<Self> {
        if levels.len() != band_set.len() {
            return Err(NoiseError::Validation(format!(
                "{:?} spectrum needs {} levels, got {}",
                band_set,
                band_set.len(),
                levels.len()
            ))
            .into());
        }
        if let Some(l) = levels.iter().find(|l| !l.is_finite()) {
            return Err(NoiseError::Validation(format!("spectrum level is not finite: {l}")).into());
        }
        Ok(Self { band_set, levels })
    }

    /// Same level in every band.
    pub fn uniform(band_set: BandSet, level: f64) -> Self {
        Self {
            band_set,
            levels: vec![level; band_set.len()],
        }
    }

    pub fn silent(band_set: BandSet) -> Self {
        Self::uniform(band_set, SILENT_LEVEL_DB)
    }

    pub fn band_set(&self) -> BandSet {
        self.band_set
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Fails with a configuration error unless this spectrum uses `expected`.
    pub fn ensure_band_set(&self, expected: BandSet) -> Result<()> {
        if self.band_set != expected {
            return Err(NoiseError::BandSetMismatch {
                expected,
                actual: self.band_set,
            }
            .into());
        }
        Ok(())
    }

    /// Adds `offset` dB to every band.
    pub fn offset(&self, offset: f64) -> Self {
        Self {
            band_set: self.band_set,
            levels: self.levels.iter().map(|l| l + offset).collect(),
        }
    }

    /// Energetic sum of all bands (unweighted overall level).
    pub fn total(&self) -> f64 {
        sum_db(self.levels.iter().copied())
    }

    /// A-weighted overall level in dB(A).
    pub fn a_weighted_total(&self) -> f64 {
        sum_db(
            self.levels
                .iter()
                .zip(self.band_set.a_weighting())
                .map(|(l, a)| l + a),
        )
    }

    /// Energetic per-band sum of several spectra of the same band set.
    pub fn sum(spectra: &[Spectrum]) -> Result<Self> {
        let first = spectra.first().ok_or_else(|| {
            NoiseError::Validation("cannot sum an empty list of spectra".to_string())
        })?;
        let band_set = first.band_set;
        let mut power = vec![0.0; band_set.len()];
        for s in spectra {
            s.ensure_band_set(band_set)?;
            for (p, l) in power.iter_mut().zip(&s.levels) {
                *p += db_to_w(*l);
            }
        }
        Ok(Self {
            band_set,
            levels: power.into_iter().map(w_to_db).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_frequencies() {
        let f = BandSet::Octave.exact_frequencies();
        assert_eq!(f.len(), 8);
        assert!((f[0] - 63.0957).abs() < 1e-3);
        assert!((f[4] - 1000.0).abs() < 1e-9);
        let f = BandSet::ThirdOctave.exact_frequencies();
        assert_eq!(f.len(), 18);
        assert!((f[0] - 100.0).abs() < 1e-9);
        assert!((f[17] - 5011.87).abs() < 1e-2);
    }

    #[test]
    fn test_parent_octave() {
        let third = BandSet::ThirdOctave;
        for i in 0..third.len() {
            let f = THIRD_OCTAVE_BAND_FREQUENCIES[i];
            let parent = OCTAVE_BAND_FREQUENCIES[third.parent_octave(i)];
            let ratio = f / parent;
            assert!(ratio > 0.7 && ratio < 1.4, "{} Hz -> {} Hz", f, parent);
        }
    }

    #[test]
    fn test_sum_db() {
        assert!((sum_db([60.0, 60.0]) - (60.0 + 10.0 * 2f64.log10())).abs() < 1e-10);
        assert_eq!(sum_db(std::iter::empty()), SILENT_LEVEL_DB);
        assert_eq!(w_to_db(0.0), SILENT_LEVEL_DB);
    }

    #[test]
    fn test_a_weighted_total() {
        let s = Spectrum::uniform(BandSet::Octave, 0.0);
        let expected = sum_db(OCTAVE_A_WEIGHTING);
        assert!((s.a_weighted_total() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_spectrum_sum_band_mismatch() {
        let a = Spectrum::uniform(BandSet::Octave, 50.0);
        let b = Spectrum::uniform(BandSet::ThirdOctave, 50.0);
        let err = Spectrum::sum(&[a.clone(), b]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<NoiseError>(),
            Some(NoiseError::BandSetMismatch { .. })
        ));
        let two = Spectrum::sum(&[a.clone(), a]).unwrap();
        assert!((two.levels()[3] - 53.0103).abs() < 1e-4);
    }

    #[test]
    fn test_spectrum_new_checks_length() {
        assert!(Spectrum::new(BandSet::Octave, vec![0.0; 7]).is_err());
        assert!(Spectrum::new(BandSet::Octave, vec![f64::NAN; 8]).is_err());
        assert!(Spectrum::new(BandSet::Octave, vec![0.0; 8]).is_ok());
    }
}
