#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use nalgebra::{DMatrix, DVector};
use snl_core::{ErrorInfo, Prior, RngHandle, Simulator, SnlError};
use snl_inference::{DiagonalGaussian, ParameterObservationBank, SnlConfig};

/// `x = θ + noise · ε` in `dim` dimensions.
pub struct ShiftedGaussian {
    pub dim: usize,
    pub noise: f64,
}

impl Simulator for ShiftedGaussian {
    fn name(&self) -> &str {
        "shifted-gaussian"
    }

    fn parameter_dim(&self) -> usize {
        self.dim
    }

    fn observation_dim(&self) -> usize {
        self.dim
    }

    fn simulate(
        &self,
        parameters: &DMatrix<f64>,
        rng: &mut RngHandle,
    ) -> Result<DMatrix<f64>, SnlError> {
        Ok(parameters.map(|theta| theta + self.noise * rng.standard_normal()))
    }
}

/// Simulator that fails on every call.
pub struct BrokenSimulator;

impl Simulator for BrokenSimulator {
    fn name(&self) -> &str {
        "broken"
    }

    fn parameter_dim(&self) -> usize {
        2
    }

    fn observation_dim(&self) -> usize {
        2
    }

    fn simulate(&self, _: &DMatrix<f64>, _: &mut RngHandle) -> Result<DMatrix<f64>, SnlError> {
        Err(SnlError::Simulation(ErrorInfo::new("simulator-crashed", "boom")))
    }
}

/// Standard normal prior that logs the size of every `sample` request.
#[derive(Clone)]
pub struct RecordingPrior {
    inner: DiagonalGaussian,
    pub requests: Rc<RefCell<Vec<usize>>>,
}

impl RecordingPrior {
    pub fn new(dim: usize) -> Self {
        Self {
            inner: DiagonalGaussian::standard(dim),
            requests: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl Prior for RecordingPrior {
    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn sample(&self, num_samples: usize, rng: &mut RngHandle) -> DMatrix<f64> {
        self.requests.borrow_mut().push(num_samples);
        self.inner.sample(num_samples, rng)
    }

    fn log_prob(&self, parameters: &DMatrix<f64>) -> Result<DVector<f64>, SnlError> {
        self.inner.log_prob(parameters)
    }
}

/// Small, fast configuration for end-to-end runs.
pub fn quick_config(seed: u64) -> SnlConfig {
    let mut config = SnlConfig::default();
    config.seed = seed;
    config.training.batch_size = 20;
    config.training.learning_rate = 1e-2;
    config.training.stop_after_epochs = 5;
    config.mcmc.warmup_steps = 30;
    config
}

/// One round of `n` examples from a two-dimensional linear Gaussian model.
pub fn linear_bank(n: usize, seed: u64) -> ParameterObservationBank {
    let mut rng = RngHandle::from_seed(seed);
    let simulator = ShiftedGaussian { dim: 2, noise: 0.3 };
    let parameters = DiagonalGaussian::standard(2).sample(n, &mut rng);
    let observations = simulator.simulate(&parameters, &mut rng).unwrap();
    let mut bank = ParameterObservationBank::new();
    bank.append(parameters, observations).unwrap();
    bank
}
