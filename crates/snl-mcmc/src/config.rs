use serde::{Deserialize, Serialize};
use snl_core::{ErrorInfo, SnlError};

/// YAML-configurable parameters governing posterior sampling chains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McmcConfig {
    /// Number of transitions discarded before samples are recorded.
    #[serde(default = "default_warmup_steps")]
    pub warmup_steps: usize,
    /// Number of transitions between recorded samples.
    #[serde(default = "default_thinning")]
    pub thinning: usize,
    /// Slice sampler settings (used by `slice-np` and `slice`).
    #[serde(default)]
    pub slice: SliceConfig,
    /// Hamiltonian Monte Carlo settings.
    #[serde(default)]
    pub hmc: HmcConfig,
    /// No-U-Turn sampler settings.
    #[serde(default)]
    pub nuts: NutsConfig,
    /// Finite-difference settings for gradient-based kernels.
    #[serde(default)]
    pub gradient: GradientConfig,
}

fn default_warmup_steps() -> usize {
    200
}

fn default_thinning() -> usize {
    1
}

impl Default for McmcConfig {
    fn default() -> Self {
        Self {
            warmup_steps: default_warmup_steps(),
            thinning: default_thinning(),
            slice: SliceConfig::default(),
            hmc: HmcConfig::default(),
            nuts: NutsConfig::default(),
            gradient: GradientConfig::default(),
        }
    }
}

impl McmcConfig {
    /// Rejects settings that would stall or break a chain.
    pub fn validate(&self) -> Result<(), SnlError> {
        if self.thinning == 0 {
            return Err(invalid("thinning", "thinning must be at least 1"));
        }
        if !(self.slice.initial_width.is_finite() && self.slice.initial_width > 0.0) {
            return Err(invalid("slice.initial_width", "slice width must be positive"));
        }
        if self.slice.max_step_out == 0 {
            return Err(invalid("slice.max_step_out", "max_step_out must be at least 1"));
        }
        if !(self.hmc.step_size.is_finite() && self.hmc.step_size > 0.0) {
            return Err(invalid("hmc.step_size", "step size must be positive"));
        }
        if self.hmc.num_steps == 0 {
            return Err(invalid("hmc.num_steps", "at least one leapfrog step is required"));
        }
        if !(self.hmc.target_accept > 0.0 && self.hmc.target_accept < 1.0) {
            return Err(invalid("hmc.target_accept", "target acceptance must lie in (0, 1)"));
        }
        if !(self.nuts.step_size.is_finite() && self.nuts.step_size > 0.0) {
            return Err(invalid("nuts.step_size", "step size must be positive"));
        }
        if self.nuts.max_tree_depth == 0 {
            return Err(invalid("nuts.max_tree_depth", "tree depth must be at least 1"));
        }
        if !(self.gradient.epsilon.is_finite() && self.gradient.epsilon > 0.0) {
            return Err(invalid("gradient.epsilon", "finite-difference step must be positive"));
        }
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> SnlError {
    SnlError::Config(ErrorInfo::new("invalid-mcmc-config", message).with_context("field", field))
}

/// Stepping-out slice sampler settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceConfig {
    /// Initial bracket width per coordinate.
    #[serde(default = "default_slice_width")]
    pub initial_width: f64,
    /// Maximum number of stepping-out expansions per side.
    #[serde(default = "default_max_step_out")]
    pub max_step_out: usize,
    /// Re-estimate per-coordinate widths from the warm-up brackets.
    #[serde(default = "default_true")]
    pub tune_width: bool,
}

fn default_slice_width() -> f64 {
    0.5
}

fn default_max_step_out() -> usize {
    50
}

fn default_true() -> bool {
    true
}

impl Default for SliceConfig {
    fn default() -> Self {
        Self {
            initial_width: default_slice_width(),
            max_step_out: default_max_step_out(),
            tune_width: default_true(),
        }
    }
}

/// Hamiltonian Monte Carlo settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HmcConfig {
    /// Initial leapfrog step size.
    #[serde(default = "default_step_size")]
    pub step_size: f64,
    /// Leapfrog steps per trajectory.
    #[serde(default = "default_num_steps")]
    pub num_steps: usize,
    /// Adapt the step size towards `target_accept` during warm-up.
    #[serde(default = "default_true")]
    pub adapt_step_size: bool,
    /// Acceptance rate targeted by warm-up adaptation.
    #[serde(default = "default_target_accept")]
    pub target_accept: f64,
}

fn default_step_size() -> f64 {
    0.1
}

fn default_num_steps() -> usize {
    10
}

fn default_target_accept() -> f64 {
    0.8
}

impl Default for HmcConfig {
    fn default() -> Self {
        Self {
            step_size: default_step_size(),
            num_steps: default_num_steps(),
            adapt_step_size: default_true(),
            target_accept: default_target_accept(),
        }
    }
}

/// No-U-Turn sampler settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutsConfig {
    /// Leapfrog step size.
    #[serde(default = "default_step_size")]
    pub step_size: f64,
    /// Maximum doubling depth of the trajectory tree.
    #[serde(default = "default_max_tree_depth")]
    pub max_tree_depth: usize,
}

fn default_max_tree_depth() -> usize {
    8
}

impl Default for NutsConfig {
    fn default() -> Self {
        Self {
            step_size: default_step_size(),
            max_tree_depth: default_max_tree_depth(),
        }
    }
}

/// Central finite-difference settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientConfig {
    /// Perturbation applied to each coordinate.
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
}

fn default_epsilon() -> f64 {
    1e-5
}

impl Default for GradientConfig {
    fn default() -> Self {
        Self {
            epsilon: default_epsilon(),
        }
    }
}
