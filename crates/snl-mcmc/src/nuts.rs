use snl_core::{RngHandle, SnlError};

use crate::config::{GradientConfig, NutsConfig};
use crate::gradient::central_difference;
use crate::hmc::{dot, draw_momentum, leapfrog, PhasePoint};
use crate::kernel::TransitionKernel;
use crate::method::McmcMethod;

/// Energy error beyond which a trajectory is considered divergent.
const MAX_ENERGY_ERROR: f64 = 1000.0;

/// Balanced trajectory subtree built by repeated doubling.
struct Subtree {
    minus: PhasePoint,
    plus: PhasePoint,
    proposal: PhasePoint,
    valid_points: usize,
    keep_going: bool,
}

/// No-U-Turn sampler with slice-variable acceptance (Hoffman & Gelman, 2014, alg. 3).
#[derive(Debug, Clone)]
pub struct NutsKernel {
    step_size: f64,
    max_tree_depth: usize,
    epsilon: f64,
}

impl NutsKernel {
    /// Creates a kernel from the NUTS and gradient settings.
    pub fn new(config: &NutsConfig, gradient: &GradientConfig) -> Self {
        Self {
            step_size: config.step_size,
            max_tree_depth: config.max_tree_depth,
            epsilon: gradient.epsilon,
        }
    }

    fn build_tree<F>(
        &self,
        log_density: &mut F,
        start: &PhasePoint,
        log_slice: f64,
        direction: f64,
        depth: usize,
        rng: &mut RngHandle,
    ) -> Result<Subtree, SnlError>
    where
        F: FnMut(&[f64]) -> Result<f64, SnlError>,
    {
        if depth == 0 {
            let point = leapfrog(log_density, start, direction * self.step_size, self.epsilon)?;
            let joint = point.joint();
            let finite = joint.is_finite();
            return Ok(Subtree {
                minus: point.clone(),
                plus: point.clone(),
                valid_points: usize::from(finite && log_slice <= joint),
                keep_going: finite && log_slice < joint + MAX_ENERGY_ERROR,
                proposal: point,
            });
        }

        let mut tree = self.build_tree(log_density, start, log_slice, direction, depth - 1, rng)?;
        if !tree.keep_going {
            return Ok(tree);
        }
        let edge = if direction < 0.0 { &tree.minus } else { &tree.plus };
        let other = self.build_tree(log_density, edge, log_slice, direction, depth - 1, rng)?;
        if direction < 0.0 {
            tree.minus = other.minus;
        } else {
            tree.plus = other.plus;
        }
        let total = tree.valid_points + other.valid_points;
        if total > 0 && rng.uniform() < other.valid_points as f64 / total as f64 {
            tree.proposal = other.proposal;
        }
        tree.valid_points = total;
        tree.keep_going = other.keep_going && no_u_turn(&tree.minus, &tree.plus);
        Ok(tree)
    }
}

fn no_u_turn(minus: &PhasePoint, plus: &PhasePoint) -> bool {
    let span: Vec<f64> = plus
        .position
        .iter()
        .zip(&minus.position)
        .map(|(a, b)| a - b)
        .collect();
    dot(&span, &minus.momentum) >= 0.0 && dot(&span, &plus.momentum) >= 0.0
}

impl TransitionKernel for NutsKernel {
    fn method(&self) -> McmcMethod {
        McmcMethod::Nuts
    }

    fn transition<F>(
        &mut self,
        position: &mut [f64],
        current: &mut f64,
        log_density: &mut F,
        rng: &mut RngHandle,
        _warmup: bool,
    ) -> Result<bool, SnlError>
    where
        F: FnMut(&[f64]) -> Result<f64, SnlError>,
    {
        let start = PhasePoint {
            position: position.to_vec(),
            momentum: draw_momentum(position.len(), rng),
            gradient: central_difference(log_density, position, self.epsilon)?,
            log_density: *current,
        };
        let log_slice = start.joint() + (1.0 - rng.uniform()).ln();

        let mut minus = start.clone();
        let mut plus = start.clone();
        let mut accepted: Option<PhasePoint> = None;
        let mut valid_points = 1usize;
        let mut depth = 0;
        let mut keep_going = true;

        while keep_going && depth < self.max_tree_depth {
            let direction = if rng.uniform() < 0.5 { -1.0 } else { 1.0 };
            let edge = if direction < 0.0 { &minus } else { &plus };
            let subtree = self.build_tree(log_density, edge, log_slice, direction, depth, rng)?;
            if direction < 0.0 {
                minus = subtree.minus;
            } else {
                plus = subtree.plus;
            }
            if subtree.keep_going
                && rng.uniform() < subtree.valid_points as f64 / valid_points as f64
            {
                accepted = Some(subtree.proposal);
            }
            valid_points += subtree.valid_points;
            keep_going = subtree.keep_going && no_u_turn(&minus, &plus);
            depth += 1;
        }

        match accepted {
            Some(point) => {
                position.copy_from_slice(&point.position);
                *current = point.log_density;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
