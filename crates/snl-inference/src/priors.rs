//! Reference priors over simulator parameters.

use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use snl_core::{ensure_width, ErrorInfo, Prior, RngHandle, SnlError};

/// Independent uniform distribution on an axis-aligned box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxUniform {
    low: Vec<f64>,
    high: Vec<f64>,
}

impl BoxUniform {
    /// Creates a box prior; every `low[i] < high[i]` must be finite.
    pub fn new(low: Vec<f64>, high: Vec<f64>) -> Result<Self, SnlError> {
        let prior = Self { low, high };
        prior.validate()?;
        Ok(prior)
    }

    /// Lower corner of the box.
    pub fn low(&self) -> &[f64] {
        &self.low
    }

    /// Upper corner of the box.
    pub fn high(&self) -> &[f64] {
        &self.high
    }

    /// Checks bounds, e.g. after deserialisation.
    pub fn validate(&self) -> Result<(), SnlError> {
        if self.low.is_empty() || self.low.len() != self.high.len() {
            return Err(SnlError::Config(
                invalid_prior("box bounds must be non-empty and of equal length")
                    .with_context("low", self.low.len())
                    .with_context("high", self.high.len()),
            ));
        }
        for (idx, (lo, hi)) in self.low.iter().zip(&self.high).enumerate() {
            if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                return Err(SnlError::Config(
                    invalid_prior("every lower bound must be below its upper bound")
                        .with_context("index", idx),
                ));
            }
        }
        Ok(())
    }

    fn log_volume(&self) -> f64 {
        self.low.iter().zip(&self.high).map(|(lo, hi)| (hi - lo).ln()).sum()
    }
}

impl Prior for BoxUniform {
    fn dim(&self) -> usize {
        self.low.len()
    }

    fn sample(&self, num_samples: usize, rng: &mut RngHandle) -> DMatrix<f64> {
        let mut out = DMatrix::zeros(num_samples, self.dim());
        for row in 0..num_samples {
            for col in 0..self.dim() {
                let u = rng.uniform();
                out[(row, col)] = self.low[col] + u * (self.high[col] - self.low[col]);
            }
        }
        out
    }

    fn log_prob(&self, parameters: &DMatrix<f64>) -> Result<DVector<f64>, SnlError> {
        ensure_width(parameters, self.dim(), "parameters")?;
        let log_density = -self.log_volume();
        Ok(DVector::from_iterator(
            parameters.nrows(),
            parameters.row_iter().map(|row| {
                let inside = row
                    .iter()
                    .zip(self.low.iter().zip(&self.high))
                    .all(|(x, (lo, hi))| x >= lo && x < hi);
                if inside {
                    log_density
                } else {
                    f64::NEG_INFINITY
                }
            }),
        ))
    }
}

/// Product of independent normal distributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagonalGaussian {
    mean: Vec<f64>,
    std: Vec<f64>,
}

impl DiagonalGaussian {
    /// Creates the prior; every standard deviation must be positive.
    pub fn new(mean: Vec<f64>, std: Vec<f64>) -> Result<Self, SnlError> {
        let prior = Self { mean, std };
        prior.validate()?;
        Ok(prior)
    }

    /// Standard normal prior in `dim` dimensions.
    pub fn standard(dim: usize) -> Self {
        Self {
            mean: vec![0.0; dim],
            std: vec![1.0; dim],
        }
    }

    /// Per-coordinate means.
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Per-coordinate standard deviations.
    pub fn std(&self) -> &[f64] {
        &self.std
    }

    /// Checks the parameters, e.g. after deserialisation.
    pub fn validate(&self) -> Result<(), SnlError> {
        if self.mean.is_empty() || self.mean.len() != self.std.len() {
            return Err(SnlError::Config(
                invalid_prior("mean and std must be non-empty and of equal length")
                    .with_context("mean", self.mean.len())
                    .with_context("std", self.std.len()),
            ));
        }
        if let Some(idx) = self.std.iter().position(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(SnlError::Config(
                invalid_prior("standard deviations must be positive").with_context("index", idx),
            ));
        }
        Ok(())
    }
}

impl Prior for DiagonalGaussian {
    fn dim(&self) -> usize {
        self.mean.len()
    }

    fn sample(&self, num_samples: usize, rng: &mut RngHandle) -> DMatrix<f64> {
        let mut out = DMatrix::zeros(num_samples, self.dim());
        for row in 0..num_samples {
            for col in 0..self.dim() {
                out[(row, col)] = self.mean[col] + self.std[col] * rng.standard_normal();
            }
        }
        out
    }

    fn log_prob(&self, parameters: &DMatrix<f64>) -> Result<DVector<f64>, SnlError> {
        ensure_width(parameters, self.dim(), "parameters")?;
        let norm: f64 = self
            .std
            .iter()
            .map(|s| -s.ln() - 0.5 * (2.0 * PI).ln())
            .sum();
        Ok(DVector::from_iterator(
            parameters.nrows(),
            parameters.row_iter().map(|row| {
                let quad: f64 = row
                    .iter()
                    .zip(self.mean.iter().zip(&self.std))
                    .map(|(x, (m, s))| ((x - m) / s).powi(2))
                    .sum();
                norm - 0.5 * quad
            }),
        ))
    }
}

/// Any of the reference priors, as written in run configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AnyPrior {
    /// See [`BoxUniform`].
    BoxUniform(BoxUniform),
    /// See [`DiagonalGaussian`].
    DiagonalGaussian(DiagonalGaussian),
}

impl AnyPrior {
    /// Validates the wrapped prior.
    pub fn validate(&self) -> Result<(), SnlError> {
        match self {
            AnyPrior::BoxUniform(prior) => prior.validate(),
            AnyPrior::DiagonalGaussian(prior) => prior.validate(),
        }
    }
}

impl Prior for AnyPrior {
    fn dim(&self) -> usize {
        match self {
            AnyPrior::BoxUniform(prior) => prior.dim(),
            AnyPrior::DiagonalGaussian(prior) => prior.dim(),
        }
    }

    fn sample(&self, num_samples: usize, rng: &mut RngHandle) -> DMatrix<f64> {
        match self {
            AnyPrior::BoxUniform(prior) => prior.sample(num_samples, rng),
            AnyPrior::DiagonalGaussian(prior) => prior.sample(num_samples, rng),
        }
    }

    fn log_prob(&self, parameters: &DMatrix<f64>) -> Result<DVector<f64>, SnlError> {
        match self {
            AnyPrior::BoxUniform(prior) => prior.log_prob(parameters),
            AnyPrior::DiagonalGaussian(prior) => prior.log_prob(parameters),
        }
    }
}

fn invalid_prior(message: &str) -> ErrorInfo {
    ErrorInfo::new("invalid-prior", message)
}
