use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use snl_core::{ErrorInfo, SnlError};

/// Closed set of MCMC methods a posterior can be sampled with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum McmcMethod {
    /// Coordinate-wise slice sampler on flat parameter vectors.
    #[default]
    SliceNp,
    /// Slice sampler driven through the structured (site map) interface.
    Slice,
    /// Hamiltonian Monte Carlo with a fixed trajectory length.
    Hmc,
    /// No-U-Turn sampler.
    Nuts,
}

impl McmcMethod {
    /// Every recognised method, in canonical order.
    pub const ALL: [McmcMethod; 4] = [
        McmcMethod::SliceNp,
        McmcMethod::Slice,
        McmcMethod::Hmc,
        McmcMethod::Nuts,
    ];

    /// Canonical name used in configs and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            McmcMethod::SliceNp => "slice-np",
            McmcMethod::Slice => "slice",
            McmcMethod::Hmc => "hmc",
            McmcMethod::Nuts => "nuts",
        }
    }

    /// Whether the method consumes site maps and minimises potential energy.
    pub fn is_structured(&self) -> bool {
        !matches!(self, McmcMethod::SliceNp)
    }
}

impl Display for McmcMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for McmcMethod {
    type Err = SnlError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        McmcMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == name)
            .ok_or_else(|| {
                SnlError::Mcmc(
                    ErrorInfo::new("unknown-mcmc-method", "unrecognised MCMC method")
                        .with_context("method", name)
                        .with_hint("expected one of slice-np, slice, hmc, nuts"),
                )
            })
    }
}
