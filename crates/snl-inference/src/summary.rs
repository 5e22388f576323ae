//! Per-round summary metrics and the recorders that extend them.

use indexmap::IndexMap;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use snl_core::{ErrorInfo, SnlError};

use crate::bank::ParameterObservationBank;

/// Epochs trained in each round.
pub const EPOCHS: &str = "epochs";
/// Best validation log-probability of each round's fit.
pub const BEST_VALIDATION_LOG_PROBS: &str = "best-validation-log-probs";
/// Wall time of each round's fit, in seconds.
pub const NEURAL_NET_FIT_TIMES: &str = "neural-net-fit-times";
/// Wall time spent sampling the proposal by MCMC, in seconds.
pub const MCMC_TIMES: &str = "mcmc-times";
/// Median distance between a round's simulations and the observed data.
pub const MEDIAN_OBSERVATION_DISTANCES: &str = "median-observation-distances";

/// Ordered mapping from metric name to one value per round.
///
/// Metrics keep their insertion order. A value recorded for a round can never
/// be replaced; rounds a metric skipped are filled with `NaN`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    metrics: IndexMap<String, Vec<f64>>,
}

impl SummaryRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value` for `metric` at `round`.
    pub fn record(&mut self, round: usize, metric: &str, value: f64) -> Result<(), SnlError> {
        let series = self.metrics.entry(metric.to_string()).or_default();
        if series.len() > round {
            return Err(SnlError::Config(
                ErrorInfo::new("metric-already-recorded", "summary values are append-only")
                    .with_context("metric", metric)
                    .with_context("round", round),
            ));
        }
        series.resize(round, f64::NAN);
        series.push(value);
        Ok(())
    }

    /// Values recorded for `metric`, one per round.
    pub fn get(&self, metric: &str) -> Option<&[f64]> {
        self.metrics.get(metric).map(Vec::as_slice)
    }

    /// Most recent value of `metric`.
    pub fn last(&self, metric: &str) -> Option<f64> {
        self.get(metric).and_then(|series| series.last().copied())
    }

    /// Iterates metrics in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.metrics
            .iter()
            .map(|(name, series)| (name.as_str(), series.as_slice()))
    }

    /// Metric names in insertion order.
    pub fn metric_names(&self) -> Vec<&str> {
        self.metrics.keys().map(String::as_str).collect()
    }

    /// Number of rounds with at least one recorded metric.
    pub fn num_rounds(&self) -> usize {
        self.metrics.values().map(Vec::len).max().unwrap_or(0)
    }

    /// Values of every metric at `round` (`NaN` where missing).
    pub fn round_values(&self, round: usize) -> IndexMap<String, f64> {
        self.metrics
            .iter()
            .map(|(name, series)| (name.clone(), series.get(round).copied().unwrap_or(f64::NAN)))
            .collect()
    }
}

/// Sink invoked once per round after the fit.
pub trait SummaryRecorder {
    /// Appends any extra metrics for `round` and forwards them to telemetry.
    fn record(
        &mut self,
        round: usize,
        observation: &DMatrix<f64>,
        bank: &ParameterObservationBank,
        simulator_name: &str,
        summary: &mut SummaryRecord,
    ) -> Result<(), SnlError>;
}

/// In-memory recorder adding the median observation distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistanceRecorder;

impl SummaryRecorder for DistanceRecorder {
    fn record(
        &mut self,
        round: usize,
        observation: &DMatrix<f64>,
        bank: &ParameterObservationBank,
        _simulator_name: &str,
        summary: &mut SummaryRecord,
    ) -> Result<(), SnlError> {
        if let Some(latest) = bank.observations().last() {
            summary.record(
                round,
                MEDIAN_OBSERVATION_DISTANCES,
                median_observation_distance(latest, observation),
            )?;
        }
        Ok(())
    }
}

/// Median Euclidean distance between the rows of `simulated` and the first
/// row of `observation`. Returns `NaN` for an empty batch.
pub fn median_observation_distance(simulated: &DMatrix<f64>, observation: &DMatrix<f64>) -> f64 {
    if simulated.nrows() == 0 || observation.nrows() == 0 {
        return f64::NAN;
    }
    let target = observation.row(0);
    let mut distances: Vec<f64> = simulated
        .row_iter()
        .map(|row| {
            row.iter()
                .zip(target.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>()
                .sqrt()
        })
        .collect();
    distances.sort_by(f64::total_cmp);
    let mid = distances.len() / 2;
    if distances.len() % 2 == 0 {
        0.5 * (distances[mid - 1] + distances[mid])
    } else {
        distances[mid]
    }
}
