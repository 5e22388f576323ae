//! Potential functions handed to the MCMC backends.
//!
//! [`PotentialFunctionProvider`] carries no state of its own: the prior, the
//! live likelihood estimator and the observation are bound on every call to
//! [`PotentialFunctionProvider::bind`], so the provider can be copied or
//! serialised at any time without capturing a stale network.
//!
//! Sign conventions differ per backend. Structured (site-map) samplers
//! minimise an energy and receive `-(log q(x_o | θ) + log p(θ))`; the flat
//! slice sampler maximises `log q(x_o | θ) + log p(θ)` directly.

use std::str::FromStr;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use snl_core::batch::{as_row, atleast_2d};
use snl_core::{ConditionalDensityEstimator, ErrorInfo, Prior, SnlError};
use snl_mcmc::{McmcMethod, Sites};

/// Stateless factory for backend-specific potential functions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PotentialFunctionProvider;

impl PotentialFunctionProvider {
    /// Creates an unbound provider.
    pub fn new() -> Self {
        Self
    }

    /// Binds the current prior, likelihood and observation and returns the
    /// potential matching `method`.
    pub fn bind<'a, P, E>(
        &self,
        prior: &'a P,
        likelihood: &'a E,
        observation: &'a DMatrix<f64>,
        method: McmcMethod,
    ) -> PotentialFunction<'a, P, E>
    where
        P: Prior + ?Sized,
        E: ConditionalDensityEstimator + ?Sized,
    {
        let bound = BoundPotential {
            prior,
            likelihood,
            observation,
        };
        if method.is_structured() {
            PotentialFunction::Structured(StructuredPotential { bound })
        } else {
            PotentialFunction::Flat(FlatPotential { bound })
        }
    }

    /// Like [`PotentialFunctionProvider::bind`], parsing the method name first.
    ///
    /// Unknown names fail with `unknown-mcmc-method` rather than falling back
    /// to the flat potential.
    pub fn bind_named<'a, P, E>(
        &self,
        prior: &'a P,
        likelihood: &'a E,
        observation: &'a DMatrix<f64>,
        method: &str,
    ) -> Result<PotentialFunction<'a, P, E>, SnlError>
    where
        P: Prior + ?Sized,
        E: ConditionalDensityEstimator + ?Sized,
    {
        let method = McmcMethod::from_str(method)?;
        Ok(self.bind(prior, likelihood, observation, method))
    }
}

/// Borrowed state shared by both potential variants.
#[derive(Debug)]
pub struct BoundPotential<'a, P: ?Sized, E: ?Sized> {
    prior: &'a P,
    likelihood: &'a E,
    observation: &'a DMatrix<f64>,
}

impl<P: ?Sized, E: ?Sized> Clone for BoundPotential<'_, P, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P: ?Sized, E: ?Sized> Copy for BoundPotential<'_, P, E> {}

impl<P, E> BoundPotential<'_, P, E>
where
    P: Prior + ?Sized,
    E: ConditionalDensityEstimator + ?Sized,
{
    /// `log q(x_o | θ) + log p(θ)` for a single `1 × d` parameter row.
    pub fn log_posterior(&self, theta: &DMatrix<f64>) -> Result<f64, SnlError> {
        let log_likelihood = self.likelihood.log_prob(self.observation, theta)?.sum();
        let log_prior = self.prior.log_prob(theta)?[0];
        Ok(log_likelihood + log_prior)
    }
}

/// Potential over a site map, returning the negated log posterior.
#[derive(Debug)]
pub struct StructuredPotential<'a, P: ?Sized, E: ?Sized> {
    bound: BoundPotential<'a, P, E>,
}

impl<P, E> StructuredPotential<'_, P, E>
where
    P: Prior + ?Sized,
    E: ConditionalDensityEstimator + ?Sized,
{
    /// Evaluates the energy of a map holding exactly one site.
    ///
    /// The site may be a `1 × d` row or a `d × 1` column.
    pub fn call(&self, sites: &Sites) -> Result<f64, SnlError> {
        let mut values = sites.iter();
        let (name, value) = match (values.next(), values.next()) {
            (Some(site), None) => site,
            _ => {
                return Err(SnlError::Mcmc(
                    ErrorInfo::new("site-count", "structured potential expects exactly one site")
                        .with_context("sites", sites.len()),
                ))
            }
        };
        if value.nrows() != 1 && value.ncols() != 1 {
            return Err(SnlError::Dimension(
                ErrorInfo::new("site-shape", "site value must be a row or column vector")
                    .with_context("site", name)
                    .with_context("rows", value.nrows())
                    .with_context("cols", value.ncols()),
            ));
        }
        Ok(-self.bound.log_posterior(&as_row(value))?)
    }
}

/// Potential over a flat parameter vector, returning the log posterior.
#[derive(Debug)]
pub struct FlatPotential<'a, P: ?Sized, E: ?Sized> {
    bound: BoundPotential<'a, P, E>,
}

impl<P, E> FlatPotential<'_, P, E>
where
    P: Prior + ?Sized,
    E: ConditionalDensityEstimator + ?Sized,
{
    /// Evaluates the log posterior of a raw parameter vector.
    pub fn call(&self, theta: &[f64]) -> Result<f64, SnlError> {
        self.bound.log_posterior(&atleast_2d(theta))
    }
}

/// A potential bound to the current estimator, tagged by backend family.
#[derive(Debug)]
pub enum PotentialFunction<'a, P: ?Sized, E: ?Sized> {
    /// Energy over a site map, for `slice`, `hmc` and `nuts`.
    Structured(StructuredPotential<'a, P, E>),
    /// Log density over `&[f64]`, for `slice-np`.
    Flat(FlatPotential<'a, P, E>),
}

impl<P: ?Sized, E: ?Sized> PotentialFunction<'_, P, E> {
    /// Returns `true` for the site-map variant.
    pub fn is_structured(&self) -> bool {
        matches!(self, PotentialFunction::Structured(_))
    }
}
