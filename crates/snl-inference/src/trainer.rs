//! Maximum-likelihood fitting of the density estimator with early stopping.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use snl_core::batch::select_rows;
use snl_core::{ensure_width, ConditionalDensityEstimator, ErrorInfo, RngHandle, SnlError};

use crate::bank::ParameterObservationBank;
use crate::config::TrainingConfig;
use crate::early_stopping::{EarlyStopping, TrainingPhase};
use crate::optim::adam;

/// Outcome of one call to [`LikelihoodTrainer::fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    /// Epochs trained before early stopping fired.
    pub epochs: usize,
    /// Epoch (1-based) whose parameters were restored.
    pub best_epoch: usize,
    /// Validation score of the restored parameters.
    pub best_validation_log_prob: f64,
    /// Size of the training split.
    pub num_training_examples: usize,
    /// Size of the validation split.
    pub num_validation_examples: usize,
    /// Pooled-bank row indices used for validation.
    pub validation_indices: Vec<usize>,
}

/// Random train/validation partition of `0..n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    /// Training row indices.
    pub training: Vec<usize>,
    /// Validation row indices.
    pub validation: Vec<usize>,
}

/// Permutes `0..num_examples` and holds out `validation_fraction` of it.
///
/// The first `round((1 - validation_fraction) * n)` permuted indices train;
/// a split leaving either side empty is rejected.
pub fn split_indices(
    num_examples: usize,
    validation_fraction: f64,
    rng: &mut RngHandle,
) -> Result<Split, SnlError> {
    let num_training = ((1.0 - validation_fraction) * num_examples as f64).round() as usize;
    let num_training = num_training.min(num_examples);
    if num_training == 0 || num_training == num_examples {
        let side = if num_training == 0 { "training" } else { "validation" };
        return Err(SnlError::Split(
            ErrorInfo::new("degenerate-split", format!("{side} split would be empty"))
                .with_context("side", side)
                .with_context("num_examples", num_examples)
                .with_context("validation_fraction", validation_fraction)
                .with_hint("simulate more examples per round or raise validation_fraction"),
        ));
    }
    let mut permutation = rng.permutation(num_examples);
    let validation = permutation.split_off(num_training);
    Ok(Split {
        training: permutation,
        validation,
    })
}

/// Mean per-example validation log-probability: summed log-probs over the
/// whole split divided by its size.
pub fn validation_log_prob<E>(
    estimator: &E,
    observations: &DMatrix<f64>,
    parameters: &DMatrix<f64>,
) -> Result<f64, SnlError>
where
    E: ConditionalDensityEstimator + ?Sized,
{
    let log_probs = estimator.log_prob(observations, parameters)?;
    Ok(log_probs.sum() / observations.nrows() as f64)
}

/// Fits a conditional density estimator to the pooled bank.
#[derive(Debug, Clone)]
pub struct LikelihoodTrainer {
    config: TrainingConfig,
}

impl LikelihoodTrainer {
    /// Creates a trainer after validating its configuration.
    pub fn new(config: TrainingConfig) -> Result<Self, SnlError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active hyper-parameters.
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Trains `estimator` on every round in `bank` until validation stalls,
    /// then restores the best epoch's parameters.
    ///
    /// The estimator models observations (inputs) given parameters (context).
    /// There is no epoch cap; a fresh split is drawn on every call.
    pub fn fit<E>(
        &self,
        bank: &ParameterObservationBank,
        estimator: &mut E,
        rng: &mut RngHandle,
    ) -> Result<TrainingSummary, SnlError>
    where
        E: ConditionalDensityEstimator + ?Sized,
    {
        let (parameters, observations) = bank.pooled()?;
        ensure_width(&observations, estimator.input_dim(), "observations")?;
        ensure_width(&parameters, estimator.context_dim(), "parameters")?;

        let split = split_indices(parameters.nrows(), self.config.validation_fraction, rng)?;
        let val_observations = select_rows(&observations, &split.validation);
        let val_parameters = select_rows(&parameters, &split.validation);
        if split.training.len() < self.config.batch_size {
            tracing::warn!(
                training_examples = split.training.len(),
                batch_size = self.config.batch_size,
                "training split smaller than one batch; no optimiser steps will run"
            );
        }

        let mut optimizer = adam(self.config.learning_rate, self.config.clip_max_norm);
        let mut stopping = EarlyStopping::new(self.config.stop_after_epochs);
        let mut best_snapshot = estimator.snapshot();
        let mut order = split.training.clone();

        while !stopping.should_stop() {
            stopping.begin_epoch();
            rng.shuffle(&mut order);
            let mut epoch_loss = 0.0;
            for batch in order.chunks_exact(self.config.batch_size) {
                let inputs = select_rows(&observations, batch);
                let context = select_rows(&parameters, batch);
                let (loss, gradient) = estimator.loss_and_gradient(&inputs, &context)?;
                if !loss.is_finite() || gradient.iter().any(|g| !g.is_finite()) {
                    return Err(SnlError::NonFinite(
                        ErrorInfo::new("non-finite-loss", "training loss is not finite")
                            .with_context("epoch", stopping.epochs() + 1)
                            .with_context("loss", loss),
                    ));
                }
                optimizer.step(estimator.parameters_mut(), &gradient)?;
                epoch_loss += loss;
            }
            stopping.finish_training_pass();

            let score = validation_log_prob(&*estimator, &val_observations, &val_parameters)?;
            if !score.is_finite() {
                return Err(SnlError::NonFinite(
                    ErrorInfo::new("non-finite-validation", "validation log-prob is not finite")
                        .with_context("epoch", stopping.epochs() + 1)
                        .with_context("score", score),
                ));
            }
            if stopping.observe(score) == TrainingPhase::Improved {
                best_snapshot = estimator.snapshot();
            }
            tracing::debug!(
                epoch = stopping.epochs(),
                training_loss = epoch_loss / (order.len() / self.config.batch_size).max(1) as f64,
                validation_log_prob = score,
                since_improvement = stopping.epochs_since_improvement(),
                "epoch finished"
            );
        }

        estimator.restore(&best_snapshot)?;
        Ok(TrainingSummary {
            epochs: stopping.epochs(),
            best_epoch: stopping.best_epoch(),
            best_validation_log_prob: stopping.best_validation_log_prob(),
            num_training_examples: split.training.len(),
            num_validation_examples: split.validation.len(),
            validation_indices: split.validation,
        })
    }
}
