//! Run, training and telemetry configuration loaded from YAML.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use snl_core::{ErrorInfo, SnlError};
use snl_mcmc::{McmcConfig, McmcMethod};

use crate::simulation::SimulationBatchSize;

/// Hyper-parameters of one likelihood fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Mini-batch size for training passes.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Adam learning rate.
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// Fraction of the pooled bank held out for validation.
    #[serde(default = "default_validation_fraction")]
    pub validation_fraction: f64,
    /// Consecutive non-improving epochs tolerated before stopping.
    #[serde(default = "default_stop_after_epochs")]
    pub stop_after_epochs: usize,
    /// Global gradient-norm bound applied before each optimiser step.
    #[serde(default = "default_clip_max_norm")]
    pub clip_max_norm: f64,
}

fn default_batch_size() -> usize {
    100
}

fn default_learning_rate() -> f64 {
    5e-4
}

fn default_validation_fraction() -> f64 {
    0.1
}

fn default_stop_after_epochs() -> usize {
    20
}

fn default_clip_max_norm() -> f64 {
    5.0
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            learning_rate: default_learning_rate(),
            validation_fraction: default_validation_fraction(),
            stop_after_epochs: default_stop_after_epochs(),
            clip_max_norm: default_clip_max_norm(),
        }
    }
}

impl TrainingConfig {
    /// Rejects values the trainer cannot run with.
    pub fn validate(&self) -> Result<(), SnlError> {
        if self.batch_size == 0 {
            return Err(invalid("training.batch_size", "batch size must be at least 1"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(invalid("training.learning_rate", "learning rate must be positive"));
        }
        if !(self.validation_fraction > 0.0 && self.validation_fraction < 1.0) {
            return Err(invalid(
                "training.validation_fraction",
                "validation fraction must lie in (0, 1)",
            ));
        }
        if self.stop_after_epochs == 0 {
            return Err(invalid(
                "training.stop_after_epochs",
                "stop_after_epochs must be at least 1",
            ));
        }
        if !(self.clip_max_norm.is_finite() && self.clip_max_norm > 0.0) {
            return Err(invalid("training.clip_max_norm", "clip norm must be positive"));
        }
        Ok(())
    }
}

/// Where per-round telemetry is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Write `summary.csv`, `events.jsonl` and `provenance.json` when set.
    #[serde(default)]
    pub enabled: bool,
    /// Root under which `snl/<simulator>/<timestamp>/` is created.
    #[serde(default = "default_log_root")]
    pub log_root: PathBuf,
}

fn default_log_root() -> PathBuf {
    PathBuf::from("logs")
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_root: default_log_root(),
        }
    }
}

/// Top-level configuration of an SNL run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnlConfig {
    /// Parameters handed to the simulator per call; `-1` means all at once.
    #[serde(default)]
    pub simulation_batch_size: SimulationBatchSize,
    /// Sampler used to draw from the posterior.
    #[serde(default)]
    pub mcmc_method: McmcMethod,
    /// Likelihood fitting settings.
    #[serde(default)]
    pub training: TrainingConfig,
    /// Sampler settings.
    #[serde(default)]
    pub mcmc: McmcConfig,
    /// Telemetry sink settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Master seed; simulation and training use derived substreams.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_seed() -> u64 {
    0x5EED
}

impl Default for SnlConfig {
    fn default() -> Self {
        Self {
            simulation_batch_size: SimulationBatchSize::default(),
            mcmc_method: McmcMethod::default(),
            training: TrainingConfig::default(),
            mcmc: McmcConfig::default(),
            telemetry: TelemetryConfig::default(),
            seed: default_seed(),
        }
    }
}

impl SnlConfig {
    /// Validates every nested section.
    pub fn validate(&self) -> Result<(), SnlError> {
        self.simulation_batch_size.validate()?;
        self.training.validate()?;
        self.mcmc.validate()
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SnlError> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|err| {
            SnlError::Config(ErrorInfo::new("config-parse", err.to_string()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a YAML file.
    pub fn load(path: &Path) -> Result<Self, SnlError> {
        let yaml = fs::read_to_string(path).map_err(|err| {
            SnlError::Serde(
                ErrorInfo::new("config-read", err.to_string())
                    .with_context("path", path.display()),
            )
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Serialises the configuration back to YAML.
    pub fn to_yaml_string(&self) -> Result<String, SnlError> {
        serde_yaml::to_string(self)
            .map_err(|err| SnlError::Serde(ErrorInfo::new("config-serialize", err.to_string())))
    }
}

fn invalid(field: &str, message: &str) -> SnlError {
    SnlError::Config(ErrorInfo::new("invalid-training-config", message).with_context("field", field))
}
