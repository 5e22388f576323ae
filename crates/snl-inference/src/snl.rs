//! Round-based orchestration of sequential neural likelihood.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use snl_core::{
    ConditionalDensityEstimator, ErrorInfo, Prior, RngHandle, Simulator, SnlError,
};

use crate::bank::ParameterObservationBank;
use crate::config::SnlConfig;
use crate::estimator::AffineAutoregressive;
use crate::evaluation::GroundTruth;
use crate::posterior::Posterior;
use crate::simulation::simulate_in_batches;
use crate::summary::{
    DistanceRecorder, SummaryRecord, SummaryRecorder, BEST_VALIDATION_LOG_PROBS, EPOCHS,
    MCMC_TIMES, NEURAL_NET_FIT_TIMES,
};
use crate::telemetry::TelemetryRecorder;
use crate::trainer::{LikelihoodTrainer, TrainingSummary};

const SIMULATION_STREAM: u64 = 0;
const TRAINING_STREAM: u64 = 1;
const EVALUATION_STREAM: u64 = 4;

/// Distribution proposing the parameters of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Proposal {
    /// The prior, used for the first round only.
    Prior,
    /// The current posterior, sampled by MCMC.
    Posterior,
}

impl Proposal {
    /// Proposal used by the zero-based round `round`.
    pub fn for_round(round: usize) -> Self {
        if round == 0 {
            Proposal::Prior
        } else {
            Proposal::Posterior
        }
    }
}

/// Sequential neural likelihood driver.
///
/// Owns the simulator, the posterior (and through it the estimator), the
/// bank and the summary. The round counter persists across calls to
/// [`Snl::run`], so only the very first round samples the prior.
pub struct Snl<S, P, E> {
    simulator: S,
    posterior: Posterior<P, E>,
    bank: ParameterObservationBank,
    trainer: LikelihoodTrainer,
    summary: SummaryRecord,
    recorder: Box<dyn SummaryRecorder>,
    ground_truth: Option<GroundTruth>,
    config: SnlConfig,
    rounds_completed: usize,
    simulation_rng: RngHandle,
    training_rng: RngHandle,
    evaluation_rng: RngHandle,
}

impl<S, P, E> Snl<S, P, E>
where
    S: Simulator,
    P: Prior,
    E: ConditionalDensityEstimator,
{
    /// Validates dimensions and configuration and assembles the run.
    ///
    /// Without an explicit `recorder`, telemetry is written when
    /// `config.telemetry.enabled` is set and kept in memory otherwise.
    pub fn new(
        simulator: S,
        prior: P,
        observed: &[f64],
        estimator: E,
        config: SnlConfig,
        recorder: Option<Box<dyn SummaryRecorder>>,
    ) -> Result<Self, SnlError> {
        config.validate()?;
        check_dimensions(&simulator, &prior, observed, &estimator)?;
        let recorder: Box<dyn SummaryRecorder> = match recorder {
            Some(recorder) => recorder,
            None if config.telemetry.enabled => Box::new(TelemetryRecorder::new(
                &config.telemetry.log_root,
                simulator.name(),
                config.seed,
            )?),
            None => Box::new(DistanceRecorder),
        };
        let posterior = Posterior::new(
            prior,
            estimator,
            observed,
            config.mcmc_method,
            config.mcmc.clone(),
        )?;
        Ok(Self {
            trainer: LikelihoodTrainer::new(config.training.clone())?,
            simulation_rng: RngHandle::substream(config.seed, SIMULATION_STREAM),
            training_rng: RngHandle::substream(config.seed, TRAINING_STREAM),
            evaluation_rng: RngHandle::substream(config.seed, EVALUATION_STREAM),
            simulator,
            posterior,
            bank: ParameterObservationBank::new(),
            summary: SummaryRecord::new(),
            recorder,
            ground_truth: None,
            config,
            rounds_completed: 0,
        })
    }

    /// Scores every later round against known true parameters and, when
    /// `truth` carries reference samples, against the exact posterior.
    pub fn with_ground_truth(mut self, truth: GroundTruth) -> Result<Self, SnlError> {
        truth.validate(self.posterior.prior().dim())?;
        self.ground_truth = Some(truth);
        Ok(self)
    }

    /// Runs `num_rounds` further rounds of `num_simulations_per_round`
    /// simulations each and returns the improved posterior.
    pub fn run(
        &mut self,
        num_rounds: usize,
        num_simulations_per_round: usize,
    ) -> Result<&Posterior<P, E>, SnlError> {
        if num_simulations_per_round == 0 {
            return Err(SnlError::Config(ErrorInfo::new(
                "empty-round",
                "num_simulations_per_round must be at least 1",
            )));
        }
        for _ in 0..num_rounds {
            self.run_round(num_simulations_per_round)?;
        }
        Ok(&self.posterior)
    }

    fn run_round(&mut self, num_simulations: usize) -> Result<TrainingSummary, SnlError> {
        let round = self.rounds_completed;
        let proposal = Proposal::for_round(round);
        let mut mcmc_seconds = 0.0;

        let posterior = &self.posterior;
        let (parameters, observations) = simulate_in_batches(
            &self.simulator,
            |n, rng| match proposal {
                Proposal::Prior => Ok(posterior.prior().sample(n, rng)),
                Proposal::Posterior => {
                    let started = Instant::now();
                    let samples = posterior.sample(n, rng);
                    mcmc_seconds += started.elapsed().as_secs_f64();
                    samples
                }
            },
            num_simulations,
            self.config.simulation_batch_size,
            &mut self.simulation_rng,
        )?;
        self.bank.append(parameters, observations)?;

        let started = Instant::now();
        let training = self.trainer.fit(
            &self.bank,
            self.posterior.neural_net_mut(),
            &mut self.training_rng,
        )?;
        let fit_seconds = started.elapsed().as_secs_f64();

        self.summary.record(round, EPOCHS, training.epochs as f64)?;
        self.summary
            .record(round, BEST_VALIDATION_LOG_PROBS, training.best_validation_log_prob)?;
        self.summary.record(round, NEURAL_NET_FIT_TIMES, fit_seconds)?;
        self.summary.record(round, MCMC_TIMES, mcmc_seconds)?;
        if let Some(truth) = &self.ground_truth {
            truth.record(round, &self.posterior, &mut self.summary, &mut self.evaluation_rng)?;
        }
        self.recorder.record(
            round,
            self.posterior.observation(),
            &self.bank,
            self.simulator.name(),
            &mut self.summary,
        )?;

        tracing::info!(
            round = round + 1,
            proposal = ?proposal,
            examples = self.bank.num_examples(),
            epochs = training.epochs,
            best_validation_log_prob = training.best_validation_log_prob,
            fit_seconds,
            mcmc_seconds,
            "round finished"
        );
        self.rounds_completed += 1;
        Ok(training)
    }

    /// Current posterior.
    pub fn posterior(&self) -> &Posterior<P, E> {
        &self.posterior
    }

    /// Consumes the driver, keeping only the posterior.
    pub fn into_posterior(self) -> Posterior<P, E> {
        self.posterior
    }

    /// Per-round metrics.
    pub fn summary(&self) -> &SummaryRecord {
        &self.summary
    }

    /// All simulations so far.
    pub fn bank(&self) -> &ParameterObservationBank {
        &self.bank
    }

    /// Rounds finished across all calls to [`Snl::run`].
    pub fn rounds_completed(&self) -> usize {
        self.rounds_completed
    }

    /// Simulator driven by the run.
    pub fn simulator(&self) -> &S {
        &self.simulator
    }

    /// Run configuration.
    pub fn config(&self) -> &SnlConfig {
        &self.config
    }
}

impl<S, P> Snl<S, P, AffineAutoregressive>
where
    S: Simulator,
    P: Prior,
{
    /// Like [`Snl::new`] with a fresh [`AffineAutoregressive`] estimator
    /// sized from the simulator.
    pub fn with_default_estimator(
        simulator: S,
        prior: P,
        observed: &[f64],
        config: SnlConfig,
        recorder: Option<Box<dyn SummaryRecorder>>,
    ) -> Result<Self, SnlError> {
        let estimator =
            AffineAutoregressive::new(simulator.observation_dim(), simulator.parameter_dim());
        Self::new(simulator, prior, observed, estimator, config, recorder)
    }
}

fn check_dimensions<S, P, E>(
    simulator: &S,
    prior: &P,
    observed: &[f64],
    estimator: &E,
) -> Result<(), SnlError>
where
    S: Simulator,
    P: Prior,
    E: ConditionalDensityEstimator,
{
    if observed.is_empty() {
        return Err(SnlError::Dimension(ErrorInfo::new(
            "empty-observation",
            "observed data must not be empty",
        )));
    }
    let checks = [
        ("prior", simulator.parameter_dim(), prior.dim()),
        ("observed data", simulator.observation_dim(), observed.len()),
        ("estimator inputs", simulator.observation_dim(), estimator.input_dim()),
        ("estimator context", simulator.parameter_dim(), estimator.context_dim()),
    ];
    for (what, expected, actual) in checks {
        if expected != actual {
            return Err(SnlError::Dimension(
                ErrorInfo::new("dimension-mismatch", format!("{what} does not match the simulator"))
                    .with_context("what", what)
                    .with_context("simulator", simulator.name())
                    .with_context("expected", expected)
                    .with_context("actual", actual),
            ));
        }
    }
    Ok(())
}
