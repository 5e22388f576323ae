//! Early-stopping state machine driving the unbounded training loop.
//!
//! The machine cycles `Training -> Validating -> {Improved | Stalled}` once
//! per epoch and ends in `Stopped` after `stop_after_epochs` consecutive
//! epochs without a strict improvement. It holds no model state, so it can be
//! driven by a synthetic sequence of validation scores.

use serde::{Deserialize, Serialize};

/// Sentinel used as the best score before the first epoch.
pub const INITIAL_BEST_VALIDATION_LOG_PROB: f64 = -1e100;

/// Phase of the training loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrainingPhase {
    /// Optimising on the training split.
    Training,
    /// Training pass done, waiting for the validation score.
    Validating,
    /// The last validation score strictly beat the best so far.
    Improved,
    /// The last validation score did not improve.
    Stalled,
    /// Stall budget exhausted; the best snapshot must be restored.
    Stopped,
}

/// Tracks the best validation score and the epochs since it was reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarlyStopping {
    stop_after_epochs: usize,
    best_validation_log_prob: f64,
    best_epoch: usize,
    epochs_since_improvement: usize,
    epochs: usize,
    phase: TrainingPhase,
}

impl EarlyStopping {
    /// Creates a machine that stops after `stop_after_epochs` stalled epochs.
    pub fn new(stop_after_epochs: usize) -> Self {
        Self {
            stop_after_epochs,
            best_validation_log_prob: INITIAL_BEST_VALIDATION_LOG_PROB,
            best_epoch: 0,
            epochs_since_improvement: 0,
            epochs: 0,
            phase: TrainingPhase::Training,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> TrainingPhase {
        self.phase
    }

    /// Returns `true` once the stall budget is exhausted.
    pub fn should_stop(&self) -> bool {
        self.phase == TrainingPhase::Stopped
    }

    /// Enters the training phase of a new epoch.
    pub fn begin_epoch(&mut self) {
        if !self.should_stop() {
            self.phase = TrainingPhase::Training;
        }
    }

    /// Marks the end of a pass over the training split.
    pub fn finish_training_pass(&mut self) {
        if !self.should_stop() {
            self.phase = TrainingPhase::Validating;
        }
    }

    /// Consumes the validation score of the epoch that just finished.
    ///
    /// Returns [`TrainingPhase::Improved`] when the caller should snapshot the
    /// model. Scores observed after stopping are ignored.
    pub fn observe(&mut self, validation_log_prob: f64) -> TrainingPhase {
        if self.should_stop() {
            return self.phase;
        }
        self.epochs += 1;
        if validation_log_prob > self.best_validation_log_prob {
            self.best_validation_log_prob = validation_log_prob;
            self.best_epoch = self.epochs;
            self.epochs_since_improvement = 0;
            self.phase = TrainingPhase::Improved;
        } else {
            self.epochs_since_improvement += 1;
            self.phase = if self.epochs_since_improvement > self.stop_after_epochs.saturating_sub(1)
            {
                TrainingPhase::Stopped
            } else {
                TrainingPhase::Stalled
            };
        }
        self.phase
    }

    /// Completed epochs.
    pub fn epochs(&self) -> usize {
        self.epochs
    }

    /// Best validation score seen so far.
    pub fn best_validation_log_prob(&self) -> f64 {
        self.best_validation_log_prob
    }

    /// Epoch (1-based) that produced the best score, or 0 if none improved.
    pub fn best_epoch(&self) -> usize {
        self.best_epoch
    }

    /// Consecutive epochs without strict improvement.
    pub fn epochs_since_improvement(&self) -> usize {
        self.epochs_since_improvement
    }
}
