use std::error::Error;
use std::fs::{self, File};
use std::path::PathBuf;

use chrono::Utc;
use clap::Args;
use snl_core::{ConditionalDensityEstimator, RngHandle, RunProvenance, Simulator};
use snl_inference::{GroundTruth, Snl};

use super::{write_json, write_samples};
use crate::run_file::{RunFile, RunFiles, RunManifest};

/// Substream used for the posterior samples stored with a run.
pub const POSTERIOR_STREAM: u64 = 2;
/// Substream used for exact reference posterior samples.
pub const REFERENCE_STREAM: u64 = 5;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// YAML run file (simulator, prior, observation and SNL settings).
    #[arg(long)]
    pub config: PathBuf,
    /// Output directory for run artefacts.
    #[arg(long)]
    pub out: PathBuf,
}

pub fn run(args: &RunArgs) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(&args.out)?;
    let run_file = RunFile::load(&args.config)?;
    let started = Utc::now();

    let mut config = run_file.snl.clone();
    if config.telemetry.log_root.is_relative() {
        config.telemetry.log_root = args.out.join(&config.telemetry.log_root);
    }
    let seed = config.seed;
    let mut snl = Snl::with_default_estimator(
        run_file.simulator.clone(),
        run_file.prior.clone(),
        &run_file.observed,
        config,
        None,
    )?;
    if let Some(true_parameters) = &run_file.true_parameters {
        let mut rng = RngHandle::substream(seed, REFERENCE_STREAM);
        let reference_samples = run_file.simulator.reference_posterior(
            &run_file.prior,
            &run_file.observed,
            run_file.num_reference_samples,
            &mut rng,
        );
        snl = snl.with_ground_truth(GroundTruth {
            true_parameters: true_parameters.clone(),
            num_posterior_samples: if reference_samples.is_some() {
                run_file.num_posterior_samples
            } else {
                0
            },
            reference_samples,
        })?;
    }
    snl.run(run_file.num_rounds, run_file.num_simulations_per_round)?;

    let mut rng = RngHandle::substream(seed, POSTERIOR_STREAM);
    let samples = snl
        .posterior()
        .sample(run_file.num_posterior_samples, &mut rng)?;

    let files = RunFiles::default();
    write_json(&args.out.join(&files.summary), snl.summary())?;
    write_json(&args.out.join(&files.bank), snl.bank())?;
    fs::write(
        args.out.join(&files.estimator),
        snl.posterior().neural_net().snapshot().to_bytes()?,
    )?;
    write_samples(File::create(args.out.join(&files.posterior_samples))?, &samples)?;
    fs::copy(&args.config, args.out.join(&files.config))?;

    let manifest = RunManifest {
        provenance: RunProvenance::new(snl.simulator().name(), seed, started.to_rfc3339()),
        rounds_completed: snl.rounds_completed(),
        num_examples: snl.bank().num_examples(),
        mcmc_method: snl.posterior().mcmc_method(),
        files,
    };
    write_json(&args.out.join("manifest.json"), &manifest)?;

    tracing::info!(
        out = %args.out.display(),
        rounds = manifest.rounds_completed,
        examples = manifest.num_examples,
        "run written"
    );
    Ok(())
}
