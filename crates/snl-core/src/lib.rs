#![deny(missing_docs)]
#![doc = "Core traits and data types for sequential neural likelihood. The collaborator traits defined here are the only seams between the SNL loop and the simulator, prior and density estimator it drives."]

use nalgebra::{DMatrix, DVector};

pub mod batch;
pub mod errors;
pub mod provenance;
pub mod rng;
pub mod snapshot;

pub use errors::{ErrorInfo, SnlError};
pub use provenance::{RunProvenance, SchemaVersion};
pub use rng::{derive_substream_seed, RngHandle};
pub use snapshot::ParameterSnapshot;

/// Forward model mapping parameter batches to observation batches.
///
/// The simulator is treated as a black box; its declared dimensionalities are
/// used to validate the prior and observed data before any round runs.
pub trait Simulator {
    /// Name used in telemetry paths and manifests.
    fn name(&self) -> &str;

    /// Width of a single parameter vector.
    fn parameter_dim(&self) -> usize;

    /// Width of a single observation vector.
    fn observation_dim(&self) -> usize;

    /// Simulates one observation per parameter row.
    fn simulate(
        &self,
        parameters: &DMatrix<f64>,
        rng: &mut RngHandle,
    ) -> Result<DMatrix<f64>, SnlError>;
}

/// Prior distribution over simulator parameters.
pub trait Prior {
    /// Dimensionality of the support.
    fn dim(&self) -> usize;

    /// Draws `num_samples` parameter rows.
    fn sample(&self, num_samples: usize, rng: &mut RngHandle) -> DMatrix<f64>;

    /// Log density of every row; `-inf` outside the support.
    fn log_prob(&self, parameters: &DMatrix<f64>) -> Result<DVector<f64>, SnlError>;
}

/// Trainable conditional density estimator `q(inputs | context)`.
///
/// For SNL the inputs are observations and the context is parameters, so the
/// estimator approximates the simulator likelihood. Parameters are exposed as
/// one flat vector so optimizers and early stopping can treat any estimator
/// uniformly.
pub trait ConditionalDensityEstimator {
    /// Width of an input (observation) row.
    fn input_dim(&self) -> usize;

    /// Width of a context (parameter) row.
    fn context_dim(&self) -> usize;

    /// Per-row log density. `context` has one row, or one row per input.
    fn log_prob(
        &self,
        inputs: &DMatrix<f64>,
        context: &DMatrix<f64>,
    ) -> Result<DVector<f64>, SnlError>;

    /// Draws `num_samples` inputs. `context` has one row, or one row per sample.
    fn sample(
        &self,
        num_samples: usize,
        context: &DMatrix<f64>,
        rng: &mut RngHandle,
    ) -> Result<DMatrix<f64>, SnlError>;

    /// Learnable parameters as a flat slice.
    fn parameters(&self) -> &[f64];

    /// Mutable view of the learnable parameters.
    fn parameters_mut(&mut self) -> &mut [f64];

    /// Mean negative log-likelihood of the batch and its gradient with
    /// respect to [`ConditionalDensityEstimator::parameters`].
    fn loss_and_gradient(
        &self,
        inputs: &DMatrix<f64>,
        context: &DMatrix<f64>,
    ) -> Result<(f64, Vec<f64>), SnlError>;

    /// Copies the current parameters into an independent snapshot.
    fn snapshot(&self) -> ParameterSnapshot {
        ParameterSnapshot::new(self.parameters().to_vec())
    }

    /// Overwrites the parameters with a previously taken snapshot.
    fn restore(&mut self, snapshot: &ParameterSnapshot) -> Result<(), SnlError> {
        let params = self.parameters_mut();
        if params.len() != snapshot.len() {
            return Err(SnlError::Dimension(
                ErrorInfo::new("snapshot-size", "snapshot does not match estimator parameters")
                    .with_context("expected", params.len())
                    .with_context("actual", snapshot.len()),
            ));
        }
        params.copy_from_slice(snapshot.values());
        Ok(())
    }
}

/// Checks that a batch has the expected width, naming the batch in the error.
pub fn ensure_width(batch: &DMatrix<f64>, expected: usize, what: &str) -> Result<(), SnlError> {
    if batch.ncols() == expected {
        return Ok(());
    }
    Err(SnlError::Dimension(
        ErrorInfo::new("dimension-mismatch", format!("{what} has the wrong width"))
            .with_context("batch", what)
            .with_context("expected", expected)
            .with_context("actual", batch.ncols()),
    ))
}
