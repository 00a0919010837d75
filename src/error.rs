use thiserror::Error;

use crate::sim::bands::BandSet;

/// Typed failures raised by the noise model.
///
/// Public functions return `anyhow::Result`; callers that need to react to a
/// particular failure use `err.downcast_ref::<NoiseError>()`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NoiseError {
    /// Malformed or degenerate input.
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("profile is not finished, call finish_building() first")]
    ProfileNotFinished,

    #[error("profile is finished and cannot be modified")]
    ProfileFinished,

    #[error("band set mismatch: expected {expected:?}, got {actual:?}")]
    BandSetMismatch { expected: BandSet, actual: BandSet },

    #[error("unknown road surface: {0}")]
    UnknownRoadSurface(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl NoiseError {
    /// True for errors that would recur for every receiver of a batch.
    pub fn is_fatal_for_batch(&self) -> bool {
        matches!(
            self,
            Self::BandSetMismatch { .. } | Self::Config(_) | Self::UnknownRoadSurface(_)
        )
    }
}

/// Returns a validation error unless `value` is a finite number in [0, 1].
pub(crate) fn check_unit_interval(value: f64, what: &str) -> anyhow::Result<()> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(NoiseError::Validation(format!("{what} must be in [0, 1], got {value}")).into());
    }
    Ok(())
}
