//! YAML run files read by `snl-sim run` and copied into every run directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use snl_core::{ErrorInfo, RunProvenance, SnlError};
use snl_inference::{AnyPrior, SnlConfig};
use snl_mcmc::McmcMethod;

use crate::simulators::ToySimulator;

/// Everything needed to reproduce a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFile {
    /// Built-in simulator and its settings.
    pub simulator: ToySimulator,
    /// Prior over simulator parameters.
    pub prior: AnyPrior,
    /// Observed data to condition on.
    pub observed: Vec<f64>,
    /// Rounds to run.
    #[serde(default = "default_num_rounds")]
    pub num_rounds: usize,
    /// Simulations per round.
    #[serde(default = "default_num_simulations_per_round")]
    pub num_simulations_per_round: usize,
    /// Posterior samples written after the last round.
    #[serde(default = "default_num_posterior_samples")]
    pub num_posterior_samples: usize,
    /// Parameters that generated `observed`, when known. Each round then
    /// records their negative log posterior density, and an MMD against the
    /// exact posterior where the simulator has one.
    #[serde(default)]
    pub true_parameters: Option<Vec<f64>>,
    /// Exact posterior samples drawn for the MMD.
    #[serde(default = "default_num_reference_samples")]
    pub num_reference_samples: usize,
    /// Inference settings.
    #[serde(default)]
    pub snl: SnlConfig,
}

fn default_num_rounds() -> usize {
    2
}

fn default_num_simulations_per_round() -> usize {
    500
}

fn default_num_posterior_samples() -> usize {
    1000
}

fn default_num_reference_samples() -> usize {
    500
}

impl RunFile {
    /// Reads and validates a run file.
    pub fn load(path: &Path) -> Result<Self, SnlError> {
        let yaml = fs::read_to_string(path).map_err(|err| {
            SnlError::Serde(
                ErrorInfo::new("run-file-read", err.to_string()).with_context("path", path.display()),
            )
        })?;
        let run_file: Self = serde_yaml::from_str(&yaml).map_err(|err| {
            SnlError::Config(
                ErrorInfo::new("run-file-parse", err.to_string()).with_context("path", path.display()),
            )
        })?;
        run_file.prior.validate()?;
        run_file.snl.validate()?;
        Ok(run_file)
    }
}

/// Files written into a run directory, relative to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFiles {
    /// Copy of the run file.
    pub config: PathBuf,
    /// Per-round metrics.
    pub summary: PathBuf,
    /// All simulations.
    pub bank: PathBuf,
    /// Bincode parameter snapshot of the trained estimator.
    pub estimator: PathBuf,
    /// Posterior samples after the last round.
    pub posterior_samples: PathBuf,
}

impl Default for RunFiles {
    fn default() -> Self {
        Self {
            config: PathBuf::from("config.yaml"),
            summary: PathBuf::from("summary.json"),
            bank: PathBuf::from("bank.json"),
            estimator: PathBuf::from("estimator.bin"),
            posterior_samples: PathBuf::from("posterior_samples.csv"),
        }
    }
}

/// `manifest.json` describing a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    /// Who produced the run and with which seed.
    pub provenance: RunProvenance,
    /// Rounds completed.
    pub rounds_completed: usize,
    /// Examples in the bank.
    pub num_examples: usize,
    /// Sampler used for the stored posterior samples.
    pub mcmc_method: McmcMethod,
    /// Artefacts of the run.
    pub files: RunFiles,
}
