//! Append-only storage of the (parameter, observation) pairs simulated so far.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use snl_core::batch::concat_rows;
use snl_core::{ErrorInfo, SnlError};

/// Cumulative bank of simulations, one entry per round.
///
/// Entries are appended once per round and never removed or rewritten. Every
/// round shares the column counts of the first round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterObservationBank {
    parameters: Vec<DMatrix<f64>>,
    observations: Vec<DMatrix<f64>>,
}

impl ParameterObservationBank {
    /// Creates an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one round of aligned parameters and observations.
    pub fn append(
        &mut self,
        parameters: DMatrix<f64>,
        observations: DMatrix<f64>,
    ) -> Result<(), SnlError> {
        check_round(
            self.parameters.len(),
            &parameters,
            &observations,
            self.parameter_dim(),
            self.observation_dim(),
        )?;
        self.parameters.push(parameters);
        self.observations.push(observations);
        Ok(())
    }

    /// Per-round parameter batches.
    pub fn parameters(&self) -> &[DMatrix<f64>] {
        &self.parameters
    }

    /// Per-round observation batches.
    pub fn observations(&self) -> &[DMatrix<f64>] {
        &self.observations
    }

    /// Number of rounds stored.
    pub fn num_rounds(&self) -> usize {
        self.parameters.len()
    }

    /// Returns `true` before the first round is appended.
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Total number of examples across all rounds.
    pub fn num_examples(&self) -> usize {
        self.parameters.iter().map(DMatrix::nrows).sum()
    }

    /// Number of examples contributed by each round.
    pub fn round_sizes(&self) -> Vec<usize> {
        self.parameters.iter().map(DMatrix::nrows).collect()
    }

    /// Parameter width, once a round has been stored.
    pub fn parameter_dim(&self) -> Option<usize> {
        self.parameters.first().map(DMatrix::ncols)
    }

    /// Observation width, once a round has been stored.
    pub fn observation_dim(&self) -> Option<usize> {
        self.observations.first().map(DMatrix::ncols)
    }

    /// All rounds stacked into `(parameters, observations)`.
    pub fn pooled(&self) -> Result<(DMatrix<f64>, DMatrix<f64>), SnlError> {
        Ok((concat_rows(&self.parameters)?, concat_rows(&self.observations)?))
    }

    /// Re-checks the bank invariants, e.g. after deserialisation.
    pub fn validate(&self) -> Result<(), SnlError> {
        if self.parameters.len() != self.observations.len() {
            return Err(SnlError::Dimension(
                ErrorInfo::new("bank-round-count", "parameter and observation rounds differ")
                    .with_context("parameter_rounds", self.parameters.len())
                    .with_context("observation_rounds", self.observations.len()),
            ));
        }
        for (round, (params, obs)) in self.parameters.iter().zip(&self.observations).enumerate() {
            check_round(
                round,
                params,
                obs,
                self.parameter_dim(),
                self.observation_dim(),
            )?;
        }
        Ok(())
    }
}

fn check_round(
    round: usize,
    parameters: &DMatrix<f64>,
    observations: &DMatrix<f64>,
    parameter_dim: Option<usize>,
    observation_dim: Option<usize>,
) -> Result<(), SnlError> {
    if parameters.nrows() != observations.nrows() {
        return Err(SnlError::Dimension(
            ErrorInfo::new("bank-row-mismatch", "parameters and observations are not aligned")
                .with_context("round", round)
                .with_context("parameters", parameters.nrows())
                .with_context("observations", observations.nrows()),
        ));
    }
    if parameters.nrows() == 0 {
        return Err(SnlError::Dimension(
            ErrorInfo::new("bank-empty-round", "a round must contribute at least one example")
                .with_context("round", round),
        ));
    }
    for (what, expected, actual) in [
        ("parameters", parameter_dim, parameters.ncols()),
        ("observations", observation_dim, observations.ncols()),
    ] {
        if let Some(expected) = expected {
            if expected != actual {
                return Err(SnlError::Dimension(
                    ErrorInfo::new("bank-width-mismatch", "round width differs from the first round")
                        .with_context("round", round)
                        .with_context("batch", what)
                        .with_context("expected", expected)
                        .with_context("actual", actual),
                ));
            }
        }
    }
    Ok(())
}
