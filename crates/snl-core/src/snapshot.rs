//! Serializable snapshots of a density estimator's learnable parameters.

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, SnlError};

/// Independent copy of an estimator's flat parameter vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSnapshot {
    values: Vec<f64>,
}

impl ParameterSnapshot {
    /// Wraps a parameter vector.
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Returns the stored parameters.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of stored parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when the snapshot holds no parameters.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Encodes the snapshot with bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnlError> {
        bincode::serialize(self)
            .map_err(|err| SnlError::Serde(ErrorInfo::new("snapshot-encode", err.to_string())))
    }

    /// Decodes a snapshot produced by [`ParameterSnapshot::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnlError> {
        bincode::deserialize(bytes).map_err(|err| {
            SnlError::Serde(
                ErrorInfo::new("snapshot-decode", err.to_string())
                    .with_context("bytes", bytes.len()),
            )
        })
    }
}
