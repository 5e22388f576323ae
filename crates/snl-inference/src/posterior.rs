//! Approximate posterior built from a learned likelihood.

use nalgebra::{DMatrix, DVector};
use snl_core::batch::{as_row, atleast_2d};
use snl_core::{ensure_width, ConditionalDensityEstimator, Prior, RngHandle, SnlError};
use snl_mcmc::{sample_flat, sample_structured, ChainOutput, McmcConfig, McmcMethod};

use crate::potential::{PotentialFunction, PotentialFunctionProvider};

/// Site name under which structured samplers see the parameters.
pub const PARAMETER_SITE: &str = "theta";

/// Posterior `p(θ | x_o) ∝ q(x_o | θ) p(θ)` sampled by MCMC.
///
/// The posterior owns the likelihood estimator. The trainer mutates it through
/// [`Posterior::neural_net_mut`] and every call to [`Posterior::sample`] binds
/// a fresh potential, so samples always reflect the latest weights.
#[derive(Debug, Clone)]
pub struct Posterior<P, E> {
    prior: P,
    neural_net: E,
    observation: DMatrix<f64>,
    method: McmcMethod,
    mcmc_config: McmcConfig,
    provider: PotentialFunctionProvider,
}

impl<P, E> Posterior<P, E>
where
    P: Prior,
    E: ConditionalDensityEstimator,
{
    /// Wraps a likelihood estimator for the observation `observation` (one row).
    pub fn new(
        prior: P,
        neural_net: E,
        observation: &[f64],
        method: McmcMethod,
        mcmc_config: McmcConfig,
    ) -> Result<Self, SnlError> {
        let observation = atleast_2d(observation);
        ensure_width(&observation, neural_net.input_dim(), "observation")?;
        mcmc_config.validate()?;
        Ok(Self {
            prior,
            neural_net,
            observation,
            method,
            mcmc_config,
            provider: PotentialFunctionProvider::new(),
        })
    }

    /// Draws `num_samples` parameter rows.
    pub fn sample(
        &self,
        num_samples: usize,
        rng: &mut RngHandle,
    ) -> Result<DMatrix<f64>, SnlError> {
        Ok(self.sample_with_diagnostics(num_samples, rng)?.samples)
    }

    /// Draws `num_samples` parameter rows and returns the chain diagnostics.
    ///
    /// The chain starts from a single prior draw.
    pub fn sample_with_diagnostics(
        &self,
        num_samples: usize,
        rng: &mut RngHandle,
    ) -> Result<ChainOutput, SnlError> {
        let init: Vec<f64> = as_row(&self.prior.sample(1, rng)).iter().copied().collect();
        let potential = self.provider.bind(
            &self.prior,
            &self.neural_net,
            &self.observation,
            self.method,
        );
        let output = match potential {
            PotentialFunction::Flat(potential) => sample_flat(
                &self.mcmc_config,
                |theta: &[f64]| potential.call(theta),
                &init,
                num_samples,
                rng,
            )?,
            PotentialFunction::Structured(potential) => sample_structured(
                self.method,
                &self.mcmc_config,
                PARAMETER_SITE,
                |sites: &snl_mcmc::Sites| potential.call(sites),
                &init,
                num_samples,
                rng,
            )?,
        };
        tracing::debug!(
            method = %self.method,
            samples = num_samples,
            acceptance_rate = output.diagnostics.acceptance_rate,
            "posterior sampled"
        );
        Ok(output)
    }

    /// Conditional log-density of the estimator.
    ///
    /// `_normalize` has no effect for a likelihood estimator; it exists for
    /// callers shared with posterior estimators.
    pub fn log_prob(
        &self,
        inputs: &DMatrix<f64>,
        context: &DMatrix<f64>,
        _normalize: bool,
    ) -> Result<DVector<f64>, SnlError> {
        self.neural_net.log_prob(inputs, context)
    }

    /// `log q(x_o | θ) + log p(θ)` for every row of `parameters`.
    pub fn unnormalized_log_prob(
        &self,
        parameters: &DMatrix<f64>,
    ) -> Result<DVector<f64>, SnlError> {
        ensure_width(parameters, self.prior.dim(), "parameters")?;
        let log_prior = self.prior.log_prob(parameters)?;
        let mut out = log_prior;
        for (idx, row) in parameters.row_iter().enumerate() {
            let theta = DMatrix::from_iterator(1, row.len(), row.iter().copied());
            out[idx] += self.neural_net.log_prob(&self.observation, &theta)?.sum();
        }
        Ok(out)
    }

    /// Live likelihood estimator.
    pub fn neural_net(&self) -> &E {
        &self.neural_net
    }

    /// Mutable access used by the trainer.
    pub fn neural_net_mut(&mut self) -> &mut E {
        &mut self.neural_net
    }

    /// Prior over parameters.
    pub fn prior(&self) -> &P {
        &self.prior
    }

    /// Observation the posterior conditions on, as a single row.
    pub fn observation(&self) -> &DMatrix<f64> {
        &self.observation
    }

    /// Sampler used by [`Posterior::sample`].
    pub fn mcmc_method(&self) -> McmcMethod {
        self.method
    }

    /// Switches the sampler.
    pub fn set_mcmc_method(&mut self, method: McmcMethod) {
        self.method = method;
    }

    /// Sampler settings.
    pub fn mcmc_config(&self) -> &McmcConfig {
        &self.mcmc_config
    }

    /// Unbound potential provider.
    pub fn provider(&self) -> PotentialFunctionProvider {
        self.provider
    }
}
