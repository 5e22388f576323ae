use serde::{Deserialize, Serialize};

use crate::method::McmcMethod;

/// Summary statistics describing a finished chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainDiagnostics {
    /// Method that produced the chain.
    pub method: McmcMethod,
    /// Transitions discarded as warm-up.
    pub warmup_steps: usize,
    /// Post warm-up transitions executed (samples × thinning).
    pub transitions: usize,
    /// Post warm-up transitions that moved the chain.
    pub moves: usize,
    /// `moves / transitions`.
    pub acceptance_rate: f64,
    /// Mean log density over the recorded samples.
    pub mean_log_density: f64,
    /// Crude per-coordinate effective sample size estimate.
    pub effective_sample_size: Vec<f64>,
}

/// Collects per-transition statistics while a chain runs.
#[derive(Debug)]
pub struct ChainRecorder {
    method: McmcMethod,
    warmup_steps: usize,
    transitions: usize,
    moves: usize,
    log_densities: Vec<f64>,
}

impl ChainRecorder {
    /// Creates a recorder for the given method.
    pub fn new(method: McmcMethod, warmup_steps: usize) -> Self {
        Self {
            method,
            warmup_steps,
            transitions: 0,
            moves: 0,
            log_densities: Vec::new(),
        }
    }

    /// Notes the outcome of one post warm-up transition.
    pub fn note_transition(&mut self, moved: bool) {
        self.transitions += 1;
        if moved {
            self.moves += 1;
        }
    }

    /// Notes the log density of a recorded sample.
    pub fn note_sample(&mut self, log_density: f64) {
        self.log_densities.push(log_density);
    }

    /// Finalises the diagnostics for the recorded `samples` (one row per sample).
    pub fn finish(self, samples: &[Vec<f64>]) -> ChainDiagnostics {
        let acceptance_rate = if self.transitions > 0 {
            self.moves as f64 / self.transitions as f64
        } else {
            0.0
        };
        let mean_log_density = if self.log_densities.is_empty() {
            f64::NAN
        } else {
            self.log_densities.iter().sum::<f64>() / self.log_densities.len() as f64
        };
        let dim = samples.first().map_or(0, Vec::len);
        let effective_sample_size = (0..dim)
            .map(|col| {
                let trace: Vec<f64> = samples.iter().map(|row| row[col]).collect();
                effective_sample_size(&trace)
            })
            .collect();
        ChainDiagnostics {
            method: self.method,
            warmup_steps: self.warmup_steps,
            transitions: self.transitions,
            moves: self.moves,
            acceptance_rate,
            mean_log_density,
            effective_sample_size,
        }
    }
}

/// Effective sample size from autocorrelations, truncated at the first
/// non-positive lag.
pub fn effective_sample_size(trace: &[f64]) -> f64 {
    let n = trace.len();
    if n < 2 {
        return n as f64;
    }
    let mean = trace.iter().sum::<f64>() / n as f64;
    let variance = trace.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
    if variance <= 0.0 {
        return n as f64;
    }
    let mut tau = 1.0;
    for lag in 1..n {
        let cov = trace[..n - lag]
            .iter()
            .zip(&trace[lag..])
            .map(|(a, b)| (a - mean) * (b - mean))
            .sum::<f64>()
            / n as f64;
        let rho = cov / variance;
        if rho <= 0.0 {
            break;
        }
        tau += 2.0 * rho;
    }
    n as f64 / tau
}
