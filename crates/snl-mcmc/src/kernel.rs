use nalgebra::DMatrix;
use snl_core::errors::ErrorInfo;
use snl_core::{RngHandle, SnlError};

use crate::config::McmcConfig;
use crate::diagnostics::{ChainDiagnostics, ChainRecorder};
use crate::hmc::HmcKernel;
use crate::method::McmcMethod;
use crate::nuts::NutsKernel;
use crate::slice::SliceKernel;

/// A Markov transition targeting an unnormalised log density.
pub trait TransitionKernel {
    /// Method implemented by the kernel.
    fn method(&self) -> McmcMethod;

    /// Performs one transition in place, returning whether the chain moved.
    ///
    /// `current` always holds the log density at `position` and must be
    /// updated together with it.
    fn transition<F>(
        &mut self,
        position: &mut [f64],
        current: &mut f64,
        log_density: &mut F,
        rng: &mut RngHandle,
        warmup: bool,
    ) -> Result<bool, SnlError>
    where
        F: FnMut(&[f64]) -> Result<f64, SnlError>;

    /// Called once between warm-up and sampling.
    fn end_warmup(&mut self) {}
}

/// Samples and diagnostics returned by a chain.
#[derive(Debug, Clone)]
pub struct ChainOutput {
    /// Recorded samples, one row per draw.
    pub samples: DMatrix<f64>,
    /// Chain statistics.
    pub diagnostics: ChainDiagnostics,
}

/// Concrete kernel selected from a method name.
#[derive(Debug, Clone)]
pub enum Kernel {
    /// Slice sampling (flat or structured).
    Slice(SliceKernel),
    /// Hamiltonian Monte Carlo.
    Hmc(HmcKernel),
    /// No-U-Turn sampler.
    Nuts(NutsKernel),
}

impl Kernel {
    /// Builds the kernel implementing `method` for a `dim`-dimensional target.
    pub fn for_method(method: McmcMethod, dim: usize, config: &McmcConfig) -> Self {
        match method {
            McmcMethod::SliceNp | McmcMethod::Slice => {
                Kernel::Slice(SliceKernel::new(method, dim, &config.slice))
            }
            McmcMethod::Hmc => Kernel::Hmc(HmcKernel::new(&config.hmc, &config.gradient)),
            McmcMethod::Nuts => Kernel::Nuts(NutsKernel::new(&config.nuts, &config.gradient)),
        }
    }
}

impl TransitionKernel for Kernel {
    fn method(&self) -> McmcMethod {
        match self {
            Kernel::Slice(kernel) => kernel.method(),
            Kernel::Hmc(kernel) => kernel.method(),
            Kernel::Nuts(kernel) => kernel.method(),
        }
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
        match self {
            Kernel::Slice(kernel) => kernel.transition(position, current, log_density, rng, warmup),
            Kernel::Hmc(kernel) => kernel.transition(position, current, log_density, rng, warmup),
            Kernel::Nuts(kernel) => kernel.transition(position, current, log_density, rng, warmup),
        }
    }

    fn end_warmup(&mut self) {
        match self {
            Kernel::Slice(kernel) => kernel.end_warmup(),
            Kernel::Hmc(kernel) => kernel.end_warmup(),
            Kernel::Nuts(kernel) => kernel.end_warmup(),
        }
    }
}

/// Runs a single chain from `init`, discarding warm-up and applying thinning.
pub fn run_chain<K, F>(
    kernel: &mut K,
    mut log_density: F,
    init: &[f64],
    num_samples: usize,
    config: &McmcConfig,
    rng: &mut RngHandle,
) -> Result<ChainOutput, SnlError>
where
    K: TransitionKernel,
    F: FnMut(&[f64]) -> Result<f64, SnlError>,
{
    config.validate()?;
    let mut position = init.to_vec();
    let mut current = log_density(&position)?;
    if !current.is_finite() {
        return Err(SnlError::Mcmc(
            ErrorInfo::new(
                "initial-point-outside-support",
                "chain must start where the target density is finite",
            )
            .with_context("method", kernel.method())
            .with_context("log_density", current),
        ));
    }

    for _ in 0..config.warmup_steps {
        kernel.transition(&mut position, &mut current, &mut log_density, rng, true)?;
    }
    kernel.end_warmup();

    let mut recorder = ChainRecorder::new(kernel.method(), config.warmup_steps);
    let mut rows = Vec::with_capacity(num_samples);
    for step in 0..num_samples * config.thinning {
        let moved = kernel.transition(&mut position, &mut current, &mut log_density, rng, false)?;
        recorder.note_transition(moved);
        if (step + 1) % config.thinning == 0 {
            recorder.note_sample(current);
            rows.push(position.clone());
        }
    }

    let diagnostics = recorder.finish(&rows);
    tracing::debug!(
        method = %diagnostics.method,
        samples = rows.len(),
        acceptance_rate = diagnostics.acceptance_rate,
        "chain finished"
    );
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Ok(ChainOutput {
        samples: DMatrix::from_row_slice(rows.len(), init.len(), &flat),
        diagnostics,
    })
}

/// Samples a flat-array target whose log density is maximised directly.
pub fn sample_flat<F>(
    config: &McmcConfig,
    log_density: F,
    init: &[f64],
    num_samples: usize,
    rng: &mut RngHandle,
) -> Result<ChainOutput, SnlError>
where
    F: FnMut(&[f64]) -> Result<f64, SnlError>,
{
    let mut kernel = Kernel::for_method(McmcMethod::SliceNp, init.len(), config);
    run_chain(&mut kernel, log_density, init, num_samples, config, rng)
}
