use snl_core::{RngHandle, SnlError};

use crate::config::{GradientConfig, HmcConfig};
use crate::gradient::central_difference;
use crate::kernel::TransitionKernel;
use crate::method::McmcMethod;

/// Phase-space point reached by a leapfrog step.
#[derive(Debug, Clone)]
pub(crate) struct PhasePoint {
    pub position: Vec<f64>,
    pub momentum: Vec<f64>,
    pub gradient: Vec<f64>,
    pub log_density: f64,
}

impl PhasePoint {
    /// Log of the joint density: log p(q) minus the kinetic energy.
    pub fn joint(&self) -> f64 {
        self.log_density - 0.5 * dot(&self.momentum, &self.momentum)
    }
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub(crate) fn draw_momentum(dim: usize, rng: &mut RngHandle) -> Vec<f64> {
    (0..dim).map(|_| rng.standard_normal()).collect()
}

/// One leapfrog step of size `step` (negative steps integrate backwards).
pub(crate) fn leapfrog<F>(
    log_density: &mut F,
    start: &PhasePoint,
    step: f64,
    epsilon: f64,
) -> Result<PhasePoint, SnlError>
where
    F: FnMut(&[f64]) -> Result<f64, SnlError>,
{
    let half: Vec<f64> = start
        .momentum
        .iter()
        .zip(&start.gradient)
        .map(|(p, g)| p + 0.5 * step * g)
        .collect();
    let position: Vec<f64> = start
        .position
        .iter()
        .zip(&half)
        .map(|(q, p)| q + step * p)
        .collect();
    let log_density_value = log_density(&position)?;
    let gradient = if log_density_value.is_finite() {
        central_difference(log_density, &position, epsilon)?
    } else {
        vec![f64::NAN; position.len()]
    };
    let momentum = half
        .iter()
        .zip(&gradient)
        .map(|(p, g)| p + 0.5 * step * g)
        .collect();
    Ok(PhasePoint {
        position,
        momentum,
        gradient,
        log_density: log_density_value,
    })
}

/// Hamiltonian Monte Carlo with identity mass matrix.
///
/// Gradients come from central finite differences of the target, so the
/// kernel works against any black-box potential.
#[derive(Debug, Clone)]
pub struct HmcKernel {
    step_size: f64,
    num_steps: usize,
    adapt_step_size: bool,
    target_accept: f64,
    epsilon: f64,
    warmup_iterations: usize,
}

impl HmcKernel {
    /// Creates a kernel from the HMC and gradient settings.
    pub fn new(config: &HmcConfig, gradient: &GradientConfig) -> Self {
        Self {
            step_size: config.step_size,
            num_steps: config.num_steps,
            adapt_step_size: config.adapt_step_size,
            target_accept: config.target_accept,
            epsilon: gradient.epsilon,
            warmup_iterations: 0,
        }
    }

    /// Current leapfrog step size.
    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    fn adapt(&mut self, accept_prob: f64) {
        self.warmup_iterations += 1;
        let gain = 1.0 / ((self.warmup_iterations + 10) as f64).sqrt();
        self.step_size *= (gain * (accept_prob - self.target_accept)).exp();
        self.step_size = self.step_size.clamp(1e-6, 10.0);
    }
}

impl TransitionKernel for HmcKernel {
    fn method(&self) -> McmcMethod {
        McmcMethod::Hmc
    }

    fn transition<F>(
        &mut self,
        position: &mut [f64],
        current: &mut f64,
        log_density: &mut F,
        rng: &mut RngHandle,
        warmup: bool,
    ) -> Result<bool, SnlError>
    where
        F: FnMut(&[f64]) -> Result<f64, SnlError>,
    {
        let start = PhasePoint {
            position: position.to_vec(),
            momentum: draw_momentum(position.len(), rng),
            gradient: central_difference(log_density, position, self.epsilon)?,
            log_density: *current,
        };
        let initial_joint = start.joint();

        let mut point = start;
        for _ in 0..self.num_steps {
            point = leapfrog(log_density, &point, self.step_size, self.epsilon)?;
            if !point.log_density.is_finite() {
                break;
            }
        }

        let proposed_joint = point.joint();
        let accept_prob = if proposed_joint.is_finite() {
            (proposed_joint - initial_joint).exp().min(1.0)
        } else {
            0.0
        };
        if warmup && self.adapt_step_size {
            self.adapt(accept_prob);
        }

        if rng.uniform() < accept_prob {
            position.copy_from_slice(&point.position);
            *current = point.log_density;
            return Ok(true);
        }
        Ok(false)
    }
}
