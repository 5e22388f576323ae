//! Ground-truth scoring of each round's posterior.
//!
//! When the parameters that generated the observation are known, every round
//! records the negative log posterior density of those parameters and, given
//! reference posterior samples, the squared maximum mean discrepancy between
//! fresh posterior samples and the reference.

use nalgebra::DMatrix;
use snl_core::batch::atleast_2d;
use snl_core::{ConditionalDensityEstimator, ErrorInfo, Prior, RngHandle, SnlError};

use crate::posterior::Posterior;
use crate::summary::SummaryRecord;

/// Squared MMD between posterior samples and reference samples.
pub const MMDS: &str = "mmds";
/// `-(log q(x_o | θ*) + log p(θ*))` at the true parameters `θ*`.
pub const NEGATIVE_LOG_PROBS_TRUE_PARAMETERS: &str = "negative-log-probs-true-parameters";

/// Known answer for a simulated observation.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundTruth {
    /// Parameters that generated the observation.
    pub true_parameters: Vec<f64>,
    /// Samples from the exact posterior, one row each, if available.
    pub reference_samples: Option<DMatrix<f64>>,
    /// Posterior samples drawn per round for the MMD.
    pub num_posterior_samples: usize,
}

impl GroundTruth {
    /// Ground truth without reference samples; only the true-parameter
    /// density is recorded.
    pub fn parameters_only(true_parameters: Vec<f64>) -> Self {
        Self {
            true_parameters,
            reference_samples: None,
            num_posterior_samples: 0,
        }
    }

    /// Checks widths against a `parameter_dim`-dimensional prior.
    pub fn validate(&self, parameter_dim: usize) -> Result<(), SnlError> {
        if self.true_parameters.len() != parameter_dim {
            return Err(SnlError::Dimension(
                ErrorInfo::new("dimension-mismatch", "true parameters do not match the prior")
                    .with_context("what", "true parameters")
                    .with_context("expected", parameter_dim)
                    .with_context("actual", self.true_parameters.len()),
            ));
        }
        if let Some(reference) = &self.reference_samples {
            if reference.ncols() != parameter_dim {
                return Err(SnlError::Dimension(
                    ErrorInfo::new("dimension-mismatch", "reference samples do not match the prior")
                        .with_context("what", "reference samples")
                        .with_context("expected", parameter_dim)
                        .with_context("actual", reference.ncols()),
                ));
            }
            if reference.nrows() < 2 || self.num_posterior_samples < 2 {
                return Err(mmd_sample_size(self.num_posterior_samples, reference.nrows()));
            }
        }
        Ok(())
    }

    /// Records this round's ground-truth metrics into `summary`.
    pub fn record<P, E>(
        &self,
        round: usize,
        posterior: &Posterior<P, E>,
        summary: &mut SummaryRecord,
        rng: &mut RngHandle,
    ) -> Result<(), SnlError>
    where
        P: Prior,
        E: ConditionalDensityEstimator,
    {
        let truth = atleast_2d(&self.true_parameters);
        let log_posterior = posterior.unnormalized_log_prob(&truth)?[0];
        summary.record(round, NEGATIVE_LOG_PROBS_TRUE_PARAMETERS, -log_posterior)?;

        if let Some(reference) = &self.reference_samples {
            let samples = posterior.sample(self.num_posterior_samples, rng)?;
            summary.record(round, MMDS, unbiased_mmd_squared(&samples, reference)?)?;
        }
        Ok(())
    }
}

fn mmd_sample_size(num_posterior_samples: usize, num_reference: usize) -> SnlError {
    SnlError::Config(
        ErrorInfo::new("mmd-sample-size", "the MMD needs at least two samples on each side")
            .with_context("posterior_samples", num_posterior_samples)
            .with_context("reference_samples", num_reference),
    )
}

fn squared_distance(a: &DMatrix<f64>, i: usize, b: &DMatrix<f64>, j: usize) -> f64 {
    a.row(i)
        .iter()
        .zip(b.row(j).iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum()
}

/// Median pairwise Euclidean distance over the rows of `x` and `y` pooled,
/// used as the Gaussian kernel bandwidth. Falls back to `1.0` when every row
/// coincides.
pub fn median_pairwise_distance(x: &DMatrix<f64>, y: &DMatrix<f64>) -> f64 {
    let pooled: Vec<(&DMatrix<f64>, usize)> = (0..x.nrows())
        .map(|i| (x, i))
        .chain((0..y.nrows()).map(|j| (y, j)))
        .collect();
    let mut distances = Vec::with_capacity(pooled.len() * pooled.len().saturating_sub(1) / 2);
    for (idx, &(a, i)) in pooled.iter().enumerate() {
        for &(b, j) in &pooled[idx + 1..] {
            distances.push(squared_distance(a, i, b, j).sqrt());
        }
    }
    if distances.is_empty() {
        return 1.0;
    }
    distances.sort_by(f64::total_cmp);
    let median = distances[distances.len() / 2];
    if median > 0.0 {
        median
    } else {
        1.0
    }
}

/// Unbiased estimate of the squared MMD between the rows of `x` and `y`
/// under a Gaussian kernel with median-heuristic bandwidth.
pub fn unbiased_mmd_squared(x: &DMatrix<f64>, y: &DMatrix<f64>) -> Result<f64, SnlError> {
    let (n, m) = (x.nrows(), y.nrows());
    if n < 2 || m < 2 {
        return Err(mmd_sample_size(n, m));
    }
    if x.ncols() != y.ncols() {
        return Err(SnlError::Dimension(
            ErrorInfo::new("dimension-mismatch", "MMD inputs must have equal widths")
                .with_context("expected", x.ncols())
                .with_context("actual", y.ncols()),
        ));
    }
    let bandwidth = median_pairwise_distance(x, y);
    let kernel = |a: &DMatrix<f64>, i: usize, b: &DMatrix<f64>, j: usize| {
        (-squared_distance(a, i, b, j) / (2.0 * bandwidth * bandwidth)).exp()
    };

    let within = |z: &DMatrix<f64>| {
        let k = z.nrows();
        let mut total = 0.0;
        for i in 0..k {
            for j in 0..k {
                if i != j {
                    total += kernel(z, i, z, j);
                }
            }
        }
        total / (k * (k - 1)) as f64
    };
    let mut cross = 0.0;
    for i in 0..n {
        for j in 0..m {
            cross += kernel(x, i, y, j);
        }
    }
    Ok(within(x) + within(y) - 2.0 * cross / (n * m) as f64)
}
