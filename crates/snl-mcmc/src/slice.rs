use snl_core::{RngHandle, SnlError};

use crate::config::SliceConfig;
use crate::kernel::TransitionKernel;
use crate::method::McmcMethod;

const MAX_SHRINK_STEPS: usize = 200;

/// Coordinate-wise stepping-out slice sampler (Neal, 2003).
///
/// Each transition visits every coordinate once in random order. During
/// warm-up the final bracket widths are recorded and, when tuning is enabled,
/// their per-coordinate mean replaces the initial width.
#[derive(Debug, Clone)]
pub struct SliceKernel {
    method: McmcMethod,
    widths: Vec<f64>,
    max_step_out: usize,
    tune_width: bool,
    bracket_sums: Vec<f64>,
    bracket_counts: Vec<usize>,
}

impl SliceKernel {
    /// Creates a kernel for a `dim`-dimensional target.
    pub fn new(method: McmcMethod, dim: usize, config: &SliceConfig) -> Self {
        Self {
            method,
            widths: vec![config.initial_width; dim],
            max_step_out: config.max_step_out,
            tune_width: config.tune_width,
            bracket_sums: vec![0.0; dim],
            bracket_counts: vec![0; dim],
        }
    }

    /// Current per-coordinate bracket widths.
    pub fn widths(&self) -> &[f64] {
        &self.widths
    }

    fn update_coordinate<F>(
        &mut self,
        idx: usize,
        position: &mut [f64],
        current: &mut f64,
        log_density: &mut F,
        rng: &mut RngHandle,
        warmup: bool,
    ) -> Result<bool, SnlError>
    where
        F: FnMut(&[f64]) -> Result<f64, SnlError>,
    {
        let x0 = position[idx];
        let width = self.widths[idx];
        let log_y = *current + (1.0 - rng.uniform()).ln();

        let mut lower = x0 - width * rng.uniform();
        let mut upper = lower + width;
        let expansions = self.max_step_out.max(1) - 1;
        let mut left_budget =
            ((self.max_step_out as f64 * rng.uniform()).floor() as usize).min(expansions);
        let mut right_budget = expansions - left_budget;

        while left_budget > 0 && evaluate_at(log_density, position, idx, lower)? > log_y {
            lower -= width;
            left_budget -= 1;
        }
        while right_budget > 0 && evaluate_at(log_density, position, idx, upper)? > log_y {
            upper += width;
            right_budget -= 1;
        }

        for _ in 0..MAX_SHRINK_STEPS {
            let candidate = lower + rng.uniform() * (upper - lower);
            let value = evaluate_at(log_density, position, idx, candidate)?;
            if value >= log_y && value.is_finite() {
                position[idx] = candidate;
                *current = value;
                if warmup {
                    self.bracket_sums[idx] += upper - lower;
                    self.bracket_counts[idx] += 1;
                }
                return Ok(candidate != x0);
            }
            if candidate < x0 {
                lower = candidate;
            } else {
                upper = candidate;
            }
        }

        // Bracket collapsed onto x0 without an acceptable point; stay put.
        position[idx] = x0;
        Ok(false)
    }
}

fn evaluate_at<F>(
    log_density: &mut F,
    position: &mut [f64],
    idx: usize,
    value: f64,
) -> Result<f64, SnlError>
where
    F: FnMut(&[f64]) -> Result<f64, SnlError>,
{
    let saved = position[idx];
    position[idx] = value;
    let result = log_density(position);
    position[idx] = saved;
    result
}

impl TransitionKernel for SliceKernel {
    fn method(&self) -> McmcMethod {
        self.method
    }

    fn transition<F>(
        &mut self,
        position: &mut [f64],
        current: &mut f64,
        log_density: &mut F,
        rng: &mut RngHandle,
        warmup: bool,
    ) -> Result<bool, SnlError>
    where
        F: FnMut(&[f64]) -> Result<f64, SnlError>,
    {
        let mut moved = false;
        for idx in rng.permutation(position.len()) {
            moved |= self.update_coordinate(idx, position, current, log_density, rng, warmup)?;
        }
        Ok(moved)
    }

    fn end_warmup(&mut self) {
        if !self.tune_width {
            return;
        }
        for idx in 0..self.widths.len() {
            if self.bracket_counts[idx] == 0 {
                continue;
            }
            let mean = self.bracket_sums[idx] / self.bracket_counts[idx] as f64;
            if mean.is_finite() && mean > 0.0 {
                self.widths[idx] = mean;
            }
        }
    }
}
