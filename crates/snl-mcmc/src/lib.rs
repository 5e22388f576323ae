#![deny(missing_docs)]

//! MCMC backends used to sample SNL posteriors.
//!
//! Two families are provided with opposite sign conventions: the flat
//! backend (`slice-np`) maximises a log density over plain `&[f64]` vectors,
//! while the structured backends (`slice`, `hmc`, `nuts`) take a map from
//! site name to value and minimise a potential energy.

/// Sampler configuration schema and defaults.
pub mod config;
/// Chain statistics.
pub mod diagnostics;
/// Finite-difference gradients for gradient-based kernels.
pub mod gradient;
/// Hamiltonian Monte Carlo kernel.
pub mod hmc;
/// Kernel trait, kernel selection and the chain driver.
pub mod kernel;
/// Closed set of MCMC method names.
pub mod method;
/// No-U-Turn kernel.
pub mod nuts;
/// Stepping-out slice kernel.
pub mod slice;
/// Site-map based samplers.
pub mod structured;

pub use config::{GradientConfig, HmcConfig, McmcConfig, NutsConfig, SliceConfig};
pub use diagnostics::{effective_sample_size, ChainDiagnostics};
pub use kernel::{run_chain, sample_flat, ChainOutput, Kernel, TransitionKernel};
pub use method::McmcMethod;
pub use structured::{sample_structured, single_site, Sites};
