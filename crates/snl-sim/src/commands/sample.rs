use std::error::Error;
use std::fs;
use std::io;
use std::path::PathBuf;

use clap::Args;
use nalgebra::DMatrix;
use snl_core::{ConditionalDensityEstimator, ParameterSnapshot, RngHandle, Simulator};
use snl_inference::{AffineAutoregressive, Posterior};
use snl_mcmc::McmcMethod;

use super::write_samples;
use crate::run_file::{RunFile, RunFiles};

/// Substream used when resampling a stored run.
pub const RESAMPLE_STREAM: u64 = 3;

#[derive(Args, Debug)]
pub struct SampleArgs {
    /// Run directory produced by `snl-sim run`.
    #[arg(long)]
    pub run: PathBuf,
    /// Number of posterior samples to draw.
    #[arg(long, default_value_t = 1000)]
    pub num_samples: usize,
    /// Override the sampler stored in the run file.
    #[arg(long)]
    pub method: Option<McmcMethod>,
    /// Override the seed stored in the run file.
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn run(args: &SampleArgs) -> Result<(), Box<dyn Error>> {
    let samples = draw(args)?;
    write_samples(io::stdout().lock(), &samples)
}

/// Rebuilds the stored posterior and draws `args.num_samples` rows.
pub fn draw(args: &SampleArgs) -> Result<DMatrix<f64>, Box<dyn Error>> {
    let files = RunFiles::default();
    let run_file = RunFile::load(&args.run.join(&files.config))?;
    let snapshot = ParameterSnapshot::from_bytes(&fs::read(args.run.join(&files.estimator))?)?;

    let simulator = &run_file.simulator;
    let mut estimator =
        AffineAutoregressive::new(simulator.observation_dim(), simulator.parameter_dim());
    estimator.restore(&snapshot)?;

    let method = args.method.unwrap_or(run_file.snl.mcmc_method);
    let posterior = Posterior::new(
        run_file.prior.clone(),
        estimator,
        &run_file.observed,
        method,
        run_file.snl.mcmc.clone(),
    )?;
    let mut rng = RngHandle::substream(args.seed.unwrap_or(run_file.snl.seed), RESAMPLE_STREAM);
    tracing::info!(run = %args.run.display(), %method, samples = args.num_samples, "sampling stored posterior");
    Ok(posterior.sample(args.num_samples, &mut rng)?)
}
