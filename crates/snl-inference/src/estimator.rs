//! Reference conditional density estimator.
//!
//! `AffineAutoregressive` is a single masked autoregressive Gaussian layer:
//!
//! ```text
//! mu_i(x, θ)       = b_i + Σ_{j<i} A_ij x_j + Σ_k W_ik θ_k
//! log σ_i(x, θ)    = s_i + Σ_k V_ik θ_k
//! log q(x | θ)     = Σ_i [ -z_i² / 2 - log σ_i - log(2π) / 2 ],  z_i = (x_i - mu_i) / σ_i
//! ```
//!
//! All parameters live in one flat vector so the trainer can optimise and
//! snapshot it directly.

use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use snl_core::batch::broadcast_rows;
use snl_core::{ensure_width, ConditionalDensityEstimator, ErrorInfo, RngHandle, SnlError};

/// Masked affine autoregressive Gaussian `q(x | θ)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffineAutoregressive {
    input_dim: usize,
    context_dim: usize,
    parameters: Vec<f64>,
}

#[derive(Debug, Clone, Copy)]
struct Layout {
    inputs: usize,
    context: usize,
}

impl Layout {
    fn triangle(self) -> usize {
        self.inputs * self.inputs.saturating_sub(1) / 2
    }

    fn shift_bias(self, i: usize) -> usize {
        i
    }

    fn autoregressive(self, i: usize, j: usize) -> usize {
        self.inputs + i * (i - 1) / 2 + j
    }

    fn shift_context(self, i: usize, k: usize) -> usize {
        self.inputs + self.triangle() + i * self.context + k
    }

    fn log_scale_bias(self, i: usize) -> usize {
        self.inputs + self.triangle() + self.inputs * self.context + i
    }

    fn log_scale_context(self, i: usize, k: usize) -> usize {
        2 * self.inputs + self.triangle() + self.inputs * self.context + i * self.context + k
    }

    fn len(self) -> usize {
        2 * self.inputs + self.triangle() + 2 * self.inputs * self.context
    }
}

impl AffineAutoregressive {
    /// Creates an estimator initialised to a standard normal for every context.
    pub fn new(input_dim: usize, context_dim: usize) -> Self {
        let layout = Layout {
            inputs: input_dim,
            context: context_dim,
        };
        Self {
            input_dim,
            context_dim,
            parameters: vec![0.0; layout.len()],
        }
    }

    /// Number of learnable parameters for the given dimensions.
    pub fn num_parameters(input_dim: usize, context_dim: usize) -> usize {
        Layout {
            inputs: input_dim,
            context: context_dim,
        }
        .len()
    }

    fn layout(&self) -> Layout {
        Layout {
            inputs: self.input_dim,
            context: self.context_dim,
        }
    }

    /// Shift and log-scale of coordinate `i` given the preceding inputs.
    fn conditional(&self, i: usize, x: &[f64], theta: &[f64]) -> (f64, f64) {
        let layout = self.layout();
        let p = &self.parameters;
        let mut shift = p[layout.shift_bias(i)];
        for (j, xj) in x.iter().enumerate().take(i) {
            shift += p[layout.autoregressive(i, j)] * xj;
        }
        let mut log_scale = p[layout.log_scale_bias(i)];
        for (k, tk) in theta.iter().enumerate() {
            shift += p[layout.shift_context(i, k)] * tk;
            log_scale += p[layout.log_scale_context(i, k)] * tk;
        }
        (shift, log_scale)
    }

    fn row_log_prob(&self, x: &[f64], theta: &[f64]) -> f64 {
        (0..self.input_dim)
            .map(|i| {
                let (shift, log_scale) = self.conditional(i, x, theta);
                let z = (x[i] - shift) * (-log_scale).exp();
                -0.5 * z * z - log_scale - 0.5 * (2.0 * PI).ln()
            })
            .sum()
    }

    fn check_batch(
        &self,
        inputs: &DMatrix<f64>,
        context: &DMatrix<f64>,
    ) -> Result<DMatrix<f64>, SnlError> {
        ensure_width(inputs, self.input_dim, "inputs")?;
        ensure_width(context, self.context_dim, "context")?;
        broadcast_rows(context, inputs.nrows())
    }
}

fn row(matrix: &DMatrix<f64>, idx: usize) -> Vec<f64> {
    matrix.row(idx).iter().copied().collect()
}

impl ConditionalDensityEstimator for AffineAutoregressive {
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn context_dim(&self) -> usize {
        self.context_dim
    }

    fn log_prob(
        &self,
        inputs: &DMatrix<f64>,
        context: &DMatrix<f64>,
    ) -> Result<DVector<f64>, SnlError> {
        let context = self.check_batch(inputs, context)?;
        Ok(DVector::from_iterator(
            inputs.nrows(),
            (0..inputs.nrows()).map(|r| self.row_log_prob(&row(inputs, r), &row(&context, r))),
        ))
    }

    fn sample(
        &self,
        num_samples: usize,
        context: &DMatrix<f64>,
        rng: &mut RngHandle,
    ) -> Result<DMatrix<f64>, SnlError> {
        ensure_width(context, self.context_dim, "context")?;
        let context = broadcast_rows(context, num_samples)?;
        let mut out = DMatrix::zeros(num_samples, self.input_dim);
        for r in 0..num_samples {
            let theta = row(&context, r);
            let mut x = vec![0.0; self.input_dim];
            for i in 0..self.input_dim {
                let (shift, log_scale) = self.conditional(i, &x, &theta);
                x[i] = shift + log_scale.exp() * rng.standard_normal();
            }
            for (i, value) in x.into_iter().enumerate() {
                out[(r, i)] = value;
            }
        }
        Ok(out)
    }

    fn parameters(&self) -> &[f64] {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut [f64] {
        &mut self.parameters
    }

    fn loss_and_gradient(
        &self,
        inputs: &DMatrix<f64>,
        context: &DMatrix<f64>,
    ) -> Result<(f64, Vec<f64>), SnlError> {
        let context = self.check_batch(inputs, context)?;
        let n = inputs.nrows();
        if n == 0 {
            return Err(SnlError::Dimension(ErrorInfo::new(
                "empty-batch",
                "cannot compute a loss over zero examples",
            )));
        }
        let layout = self.layout();
        let mut gradient = vec![0.0; layout.len()];
        let mut loss = 0.0;
        for r in 0..n {
            let x = row(inputs, r);
            let theta = row(&context, r);
            for i in 0..self.input_dim {
                let (shift, log_scale) = self.conditional(i, &x, &theta);
                let inv_scale = (-log_scale).exp();
                let z = (x[i] - shift) * inv_scale;
                loss += 0.5 * z * z + log_scale + 0.5 * (2.0 * PI).ln();

                // Derivatives of -log q with respect to the shift and log-scale.
                let d_shift = -z * inv_scale;
                let d_log_scale = 1.0 - z * z;
                gradient[layout.shift_bias(i)] += d_shift;
                for (j, xj) in x.iter().enumerate().take(i) {
                    gradient[layout.autoregressive(i, j)] += d_shift * xj;
                }
                gradient[layout.log_scale_bias(i)] += d_log_scale;
                for (k, tk) in theta.iter().enumerate() {
                    gradient[layout.shift_context(i, k)] += d_shift * tk;
                    gradient[layout.log_scale_context(i, k)] += d_log_scale * tk;
                }
            }
        }
        let scale = 1.0 / n as f64;
        gradient.iter_mut().for_each(|g| *g *= scale);
        Ok((loss * scale, gradient))
    }
}
