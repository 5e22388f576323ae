//! Built-in toy simulators.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use snl_core::{ensure_width, RngHandle, Simulator, SnlError};
use snl_inference::AnyPrior;

/// Draws tried per reference sample before a box prior is given up on.
const REJECTION_ATTEMPTS_PER_SAMPLE: usize = 1000;

/// Simulators selectable from a run file by `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum ToySimulator {
    /// `x = θ + noise · ε`, `ε ~ N(0, I)`.
    LinearGaussian {
        /// Parameter and observation dimension.
        dim: usize,
        /// Observation noise standard deviation.
        #[serde(default = "default_noise")]
        noise: f64,
    },
    /// `x = θ + σ · ε` with `σ` drawn per row from `{wide_std, narrow_std}`
    /// with equal probability.
    GaussianMixture {
        /// Parameter and observation dimension.
        dim: usize,
        /// Standard deviation of the broad component.
        #[serde(default = "default_wide_std")]
        wide_std: f64,
        /// Standard deviation of the narrow component.
        #[serde(default = "default_narrow_std")]
        narrow_std: f64,
    },
}

fn default_noise() -> f64 {
    0.5
}

fn default_wide_std() -> f64 {
    1.0
}

fn default_narrow_std() -> f64 {
    0.1
}

impl ToySimulator {
    /// Every built-in simulator with default settings in `dim` dimensions.
    pub fn catalogue(dim: usize) -> Vec<Self> {
        vec![
            ToySimulator::LinearGaussian {
                dim,
                noise: default_noise(),
            },
            ToySimulator::GaussianMixture {
                dim,
                wide_std: default_wide_std(),
                narrow_std: default_narrow_std(),
            },
        ]
    }

    /// One-line description used by `snl-sim simulators`.
    pub fn describe(&self) -> &'static str {
        match self {
            ToySimulator::LinearGaussian { .. } => "x = θ + noise·ε",
            ToySimulator::GaussianMixture { .. } => {
                "x = θ + σ·ε, σ ∈ {wide_std, narrow_std} with equal weight"
            }
        }
    }

    /// Exact posterior samples given `observed`, where they can be drawn
    /// directly.
    ///
    /// Only the linear-Gaussian simulator has them: under a Gaussian prior the
    /// posterior factorises into Gaussians, under a box prior it is the
    /// likelihood truncated to the box. `None` otherwise, or when the box
    /// rejects too many draws.
    pub fn reference_posterior(
        &self,
        prior: &AnyPrior,
        observed: &[f64],
        num_samples: usize,
        rng: &mut RngHandle,
    ) -> Option<DMatrix<f64>> {
        let ToySimulator::LinearGaussian { dim, noise } = self else {
            return None;
        };
        let dim = *dim;
        if observed.len() != dim {
            return None;
        }
        let noise_precision = noise.powi(-2);
        match prior {
            AnyPrior::DiagonalGaussian(prior) => {
                let mut samples = DMatrix::zeros(num_samples, dim);
                for j in 0..dim {
                    let prior_precision = prior.std()[j].powi(-2);
                    let variance = 1.0 / (prior_precision + noise_precision);
                    let mean = variance
                        * (prior.mean()[j] * prior_precision + observed[j] * noise_precision);
                    for i in 0..num_samples {
                        samples[(i, j)] = mean + variance.sqrt() * rng.standard_normal();
                    }
                }
                Some(samples)
            }
            AnyPrior::BoxUniform(prior) => {
                let mut rows = Vec::with_capacity(num_samples * dim);
                let mut accepted = 0;
                for _ in 0..num_samples * REJECTION_ATTEMPTS_PER_SAMPLE {
                    if accepted == num_samples {
                        break;
                    }
                    let draw: Vec<f64> = observed
                        .iter()
                        .map(|x| x + noise * rng.standard_normal())
                        .collect();
                    let inside = draw
                        .iter()
                        .zip(prior.low().iter().zip(prior.high()))
                        .all(|(value, (low, high))| value >= low && value < high);
                    if inside {
                        rows.extend(draw);
                        accepted += 1;
                    }
                }
                if accepted < num_samples {
                    tracing::warn!(
                        accepted,
                        requested = num_samples,
                        "box prior rejected too many reference draws"
                    );
                    return None;
                }
                Some(DMatrix::from_row_slice(num_samples, dim, &rows))
            }
        }
    }

    fn dim(&self) -> usize {
        match self {
            ToySimulator::LinearGaussian { dim, .. } | ToySimulator::GaussianMixture { dim, .. } => {
                *dim
            }
        }
    }
}

impl Simulator for ToySimulator {
    fn name(&self) -> &str {
        match self {
            ToySimulator::LinearGaussian { .. } => "linear-gaussian",
            ToySimulator::GaussianMixture { .. } => "gaussian-mixture",
        }
    }

    fn parameter_dim(&self) -> usize {
        self.dim()
    }

    fn observation_dim(&self) -> usize {
        self.dim()
    }

    fn simulate(
        &self,
        parameters: &DMatrix<f64>,
        rng: &mut RngHandle,
    ) -> Result<DMatrix<f64>, SnlError> {
        ensure_width(parameters, self.dim(), "parameters")?;
        let mut out = parameters.clone();
        for mut row in out.row_iter_mut() {
            let scale = match self {
                ToySimulator::LinearGaussian { noise, .. } => *noise,
                ToySimulator::GaussianMixture {
                    wide_std,
                    narrow_std,
                    ..
                } => {
                    if rng.uniform() < 0.5 {
                        *wide_std
                    } else {
                        *narrow_std
                    }
                }
            };
            for value in row.iter_mut() {
                *value += scale * rng.standard_normal();
            }
        }
        Ok(out)
    }
}
