//! Structured-input samplers.
//!
//! These backends address parameters by site name and minimise a potential
//! energy instead of maximising a log density. A potential evaluated here is
//! `-log p(θ | x)` up to a constant.

use std::collections::BTreeMap;

use nalgebra::DMatrix;
use snl_core::errors::ErrorInfo;
use snl_core::{RngHandle, SnlError};

use crate::config::McmcConfig;
use crate::kernel::{run_chain, ChainOutput, Kernel};
use crate::method::McmcMethod;

/// Mapping from parameter-site name to its current value.
pub type Sites = BTreeMap<String, DMatrix<f64>>;

/// Builds a site map holding one `1 × d` site.
pub fn single_site(name: &str, values: &[f64]) -> Sites {
    let mut sites = Sites::new();
    sites.insert(
        name.to_string(),
        DMatrix::from_row_slice(1, values.len(), values),
    );
    sites
}

/// Samples a structured target by minimising `potential` over one site.
pub fn sample_structured<F>(
    method: McmcMethod,
    config: &McmcConfig,
    site: &str,
    mut potential: F,
    init: &[f64],
    num_samples: usize,
    rng: &mut RngHandle,
) -> Result<ChainOutput, SnlError>
where
    F: FnMut(&Sites) -> Result<f64, SnlError>,
{
    if !method.is_structured() {
        return Err(SnlError::Mcmc(
            ErrorInfo::new(
                "flat-method-on-structured-backend",
                "method does not accept site maps",
            )
            .with_context("method", method),
        ));
    }
    let mut kernel = Kernel::for_method(method, init.len(), config);
    let log_density = |values: &[f64]| -> Result<f64, SnlError> {
        let energy = potential(&single_site(site, values))?;
        Ok(-energy)
    };
    run_chain(&mut kernel, log_density, init, num_samples, config, rng)
}
