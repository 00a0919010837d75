use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::Point;
use crate::error::NoiseError;
use crate::sim::aggregate::{LevelAggregator, ReceiverResult};
use crate::sim::attenuation::AttenuationCalculator;
use crate::sim::emission::PointSource;
use crate::sim::paths::PathFinder;
use crate::sim::profile::Profile;

use super::config::PropagationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Receiver {
    pub id: u64,
    pub position: Point,
}

impl Receiver {
    pub fn new(id: u64, position: Point) -> Self {
        Self { id, position }
    }
}

/// Outcome of a batch.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Successful receivers by id.
    pub results: BTreeMap<u64, ReceiverResult>,
    /// Error message of each failed receiver by id.
    pub failures: BTreeMap<u64, String>,
    /// True if the batch stopped on the cancellation flag.
    pub cancelled: bool,
}

/// Evaluates receivers in parallel against a finished profile.
pub struct BatchRunner<'a> {
    config: PropagationConfig,
    profile: &'a Profile,
    finder: PathFinder,
    calculator: AttenuationCalculator,
    aggregator: LevelAggregator,
    cancel: Arc<AtomicBool>,
}

impl<'a> BatchRunner<'a> {
    pub fn new(config: PropagationConfig, profile: &'a Profile) -> Result<Self> {
        config.validate()?;
        if !profile.is_finished() {
            return Err(NoiseError::ProfileNotFinished.into());
        }
        Ok(Self {
            finder: PathFinder::new(config.path_options()),
            calculator: config.attenuation_calculator()?,
            aggregator: LevelAggregator::new(config.band_set),
            config,
            profile,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &PropagationConfig {
        &self.config
    }

    /// Setting the flag stops the batch before the next receiver.
    /// Receivers already evaluated are kept.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Levels at one receiver from all sources within range.
    pub fn evaluate_receiver(
        &self,
        receiver: &Receiver,
        sources: &[PointSource],
    ) -> Result<ReceiverResult> {
        let mut contributions = Vec::new();
        for (i, source) in sources.iter().enumerate() {
            if source.position.distance(&receiver.position) > self.config.max_source_distance {
                continue;
            }
            for path in self
                .finder
                .find_paths(source.position, receiver.position, self.profile)?
            {
                let attenuation = self.calculator.score(&path)?;
                contributions.push(self.aggregator.contribution(
                    i,
                    &source.spectrum,
                    path,
                    attenuation,
                )?);
            }
        }
        self.aggregator
            .aggregate(receiver.id, receiver.position, contributions)
    }

    /// Evaluates all receivers.
    ///
    /// A failing receiver is recorded in the report and the batch goes on.
    /// Configuration errors stop the batch and are returned.
    pub fn run(&self, sources: &[PointSource], receivers: &[Receiver]) -> Result<BatchReport> {
        self.run_with_progress(sources, receivers, |_| {})
    }

    /// Same as [`BatchRunner::run`], calling `on_done` from the worker thread
    /// after each successfully evaluated receiver.
    pub fn run_with_progress<F>(
        &self,
        sources: &[PointSource],
        receivers: &[Receiver],
        on_done: F,
    ) -> Result<BatchReport>
    where
        F: Fn(&ReceiverResult) + Sync,
    {
        for source in sources {
            if let Err(e) = source.spectrum.ensure_band_set(self.config.band_set) {
                error!(error = %e, "Source spectra do not match the configured band set");
                return Err(e);
            }
        }
        let mut ids = BTreeSet::new();
        for r in receivers {
            if !ids.insert(r.id) {
                return Err(
                    NoiseError::Validation(format!("duplicate receiver id {}", r.id)).into(),
                );
            }
        }

        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(threads) = self.config.threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder.build()?;
        info!(
            receivers = receivers.len(),
            sources = sources.len(),
            threads = pool.current_num_threads(),
            "Batch started"
        );

        let abort = AtomicBool::new(false);
        let outcomes: Vec<(u64, Option<Result<ReceiverResult>>)> = pool.install(|| {
            receivers
                .par_iter()
                .map(|r| {
                    if self.cancel.load(Ordering::Relaxed) || abort.load(Ordering::Relaxed) {
                        return (r.id, None);
                    }
                    let outcome = self.evaluate_receiver(r, sources);
                    match &outcome {
                        Ok(result) => on_done(result),
                        Err(e)
                            if e.downcast_ref::<NoiseError>()
                                .is_some_and(NoiseError::is_fatal_for_batch) =>
                        {
                            abort.store(true, Ordering::Relaxed);
                        }
                        Err(_) => {}
                    }
                    (r.id, Some(outcome))
                })
                .collect()
        });

        let mut report = BatchReport::default();
        for (id, outcome) in outcomes {
            match outcome {
                Some(Ok(result)) => {
                    report.results.insert(id, result);
                }
                Some(Err(e)) => {
                    if e.downcast_ref::<NoiseError>()
                        .is_some_and(NoiseError::is_fatal_for_batch)
                    {
                        error!(receiver = id, error = %e, "Batch aborted");
                        return Err(e);
                    }
                    warn!(receiver = id, error = %e, "Receiver failed");
                    report.failures.insert(id, format!("{e:#}"));
                }
                None => report.cancelled = true,
            }
        }

        info!(
            results = report.results.len(),
            failures = report.failures.len(),
            cancelled = report.cancelled,
            "Batch finished"
        );
        Ok(report)
    }
}
