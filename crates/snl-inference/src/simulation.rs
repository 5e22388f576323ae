//! Batched execution of the simulator over proposed parameters.

use std::fmt;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use snl_core::batch::{concat_rows, select_rows};
use snl_core::{ensure_width, ErrorInfo, RngHandle, Simulator, SnlError};

/// Number of parameter rows handed to the simulator per call.
///
/// Serialised as an integer: `-1` for [`SimulationBatchSize::All`], otherwise
/// a positive chunk size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum SimulationBatchSize {
    /// Simulate every proposed parameter in one call.
    All,
    /// Simulate at most this many parameters per call.
    Fixed(usize),
}

impl Default for SimulationBatchSize {
    fn default() -> Self {
        SimulationBatchSize::Fixed(1)
    }
}

impl SimulationBatchSize {
    /// Chunk length used for `num_samples` proposals.
    pub fn chunk_len(self, num_samples: usize) -> usize {
        match self {
            SimulationBatchSize::All => num_samples.max(1),
            SimulationBatchSize::Fixed(size) => size,
        }
    }

    /// Rejects `Fixed(0)`, which serde never produces but direct
    /// construction can.
    pub fn validate(self) -> Result<(), SnlError> {
        match self {
            SimulationBatchSize::Fixed(0) => Err(SnlError::Config(invalid_batch_size(0))),
            _ => Ok(()),
        }
    }
}

impl TryFrom<i64> for SimulationBatchSize {
    type Error = SnlError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        let parsed = match value {
            -1 => Ok(SimulationBatchSize::All),
            size if size >= 1 => usize::try_from(size)
                .map(SimulationBatchSize::Fixed)
                .map_err(|err| invalid_batch_size(value).with_hint(err.to_string())),
            _ => Err(invalid_batch_size(value)),
        };
        parsed.map_err(SnlError::Config)
    }
}

impl From<SimulationBatchSize> for i64 {
    fn from(value: SimulationBatchSize) -> Self {
        match value {
            SimulationBatchSize::All => -1,
            SimulationBatchSize::Fixed(size) => i64::try_from(size).unwrap_or(i64::MAX),
        }
    }
}

impl fmt::Display for SimulationBatchSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", i64::from(*self))
    }
}

fn invalid_batch_size(value: i64) -> ErrorInfo {
    ErrorInfo::new(
        "invalid-simulation-batch-size",
        "simulation batch size must be -1 or a positive integer",
    )
    .with_context("value", value)
}

/// Draws `num_samples` parameters with `sample_parameters` and simulates them
/// in chunks of `batch_size`, returning aligned `(parameters, observations)`.
pub fn simulate_in_batches<S, F>(
    simulator: &S,
    mut sample_parameters: F,
    num_samples: usize,
    batch_size: SimulationBatchSize,
    rng: &mut RngHandle,
) -> Result<(DMatrix<f64>, DMatrix<f64>), SnlError>
where
    S: Simulator + ?Sized,
    F: FnMut(usize, &mut RngHandle) -> Result<DMatrix<f64>, SnlError>,
{
    batch_size.validate()?;
    let parameters = sample_parameters(num_samples, rng)?;
    if parameters.nrows() != num_samples {
        return Err(SnlError::Dimension(
            ErrorInfo::new("proposal-size", "proposal returned the wrong number of parameters")
                .with_context("expected", num_samples)
                .with_context("actual", parameters.nrows()),
        ));
    }
    ensure_width(&parameters, simulator.parameter_dim(), "proposed parameters")?;

    let chunk_len = batch_size.chunk_len(num_samples);
    let indices: Vec<usize> = (0..num_samples).collect();
    let mut blocks = Vec::with_capacity(num_samples.div_ceil(chunk_len));
    for chunk in indices.chunks(chunk_len) {
        let batch = select_rows(&parameters, chunk);
        let simulated = simulator.simulate(&batch, rng)?;
        if simulated.nrows() != chunk.len() {
            return Err(SnlError::Simulation(
                ErrorInfo::new("simulation-size", "simulator must return one row per parameter")
                    .with_context("simulator", simulator.name())
                    .with_context("expected", chunk.len())
                    .with_context("actual", simulated.nrows()),
            ));
        }
        ensure_width(&simulated, simulator.observation_dim(), "simulated observations")?;
        blocks.push(simulated);
    }

    let observations = if blocks.is_empty() {
        DMatrix::zeros(0, simulator.observation_dim())
    } else {
        concat_rows(&blocks)?
    };
    Ok((parameters, observations))
}
