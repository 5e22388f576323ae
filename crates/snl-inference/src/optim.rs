//! Adam updates and gradient-norm clipping for a flat parameter vector,
//! driven by burn's optimiser on the CPU `ndarray` backend.
//!
//! The estimator exposes its weights as one `Vec<f64>` together with an
//! analytic gradient. [`FlatParameters`] lifts that vector into a burn
//! [`Module`] holding a single parameter tensor under a stable [`ParamId`], so
//! burn's Adam keeps its moment estimates across steps. With one tensor the
//! per-parameter clipping norm is the global gradient norm.

use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use burn::grad_clipping::{GradientClipping, GradientClippingConfig};
use burn::module::{Param, ParamId};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::TensorData;
use snl_core::{ErrorInfo, SnlError};

/// Backend holding parameter and gradient values.
pub type ParameterBackend = NdArray<f64>;
/// Backend the optimiser steps on.
pub type TrainingBackend = Autodiff<ParameterBackend>;

/// Flat estimator weights as a burn module.
#[derive(Module, Debug)]
pub struct FlatParameters<B: Backend> {
    values: Param<Tensor<B, 1>>,
}

impl<B: Backend> FlatParameters<B> {
    fn new(id: ParamId, values: &[f64], device: &B::Device) -> Self {
        Self {
            values: Param::initialized(id, flat_tensor(values, device).require_grad()),
        }
    }

    /// Current weights.
    pub fn to_vec(&self) -> Result<Vec<f64>, SnlError> {
        tensor_to_vec(self.values.val())
    }
}

fn flat_tensor<B: Backend>(values: &[f64], device: &B::Device) -> Tensor<B, 1> {
    Tensor::from_data(TensorData::new(values.to_vec(), [values.len()]), device)
}

fn tensor_to_vec<B: Backend>(tensor: Tensor<B, 1>) -> Result<Vec<f64>, SnlError> {
    tensor.into_data().to_vec::<f64>().map_err(|err| {
        SnlError::NonFinite(ErrorInfo::new(
            "tensor-readback",
            format!("could not read parameter tensor: {err:?}"),
        ))
    })
}

/// Rescales `gradient` in place so its L2 norm is at most `max_norm` and
/// returns the norm before clipping.
pub fn clip_grad_norm(gradient: &mut [f64], max_norm: f64) -> Result<f64, SnlError> {
    let clipping = GradientClippingConfig::Norm(max_norm as f32).init();
    clip_with(&clipping, gradient)
}

fn clip_with(clipping: &GradientClipping, gradient: &mut [f64]) -> Result<f64, SnlError> {
    let device = NdArrayDevice::Cpu;
    let tensor = flat_tensor::<ParameterBackend>(gradient, &device);
    let norm: f64 = tensor.clone().powf_scalar(2.0).sum().sqrt().into_scalar();
    let clipped = tensor_to_vec(clipping.clip_gradient(tensor))?;
    gradient.copy_from_slice(&clipped);
    Ok(norm)
}

/// Adam over a flat parameter vector, clipping each gradient first.
pub struct Adam<O> {
    optimizer: O,
    clipping: GradientClipping,
    learning_rate: f64,
    id: ParamId,
    device: NdArrayDevice,
    steps: usize,
}

/// Adam (betas 0.9/0.999, eps 1e-8) with gradient-norm clipping at `max_norm`.
pub fn adam(
    learning_rate: f64,
    max_norm: f64,
) -> Adam<impl Optimizer<FlatParameters<TrainingBackend>, TrainingBackend>> {
    Adam {
        optimizer: AdamConfig::new()
            .with_beta_1(0.9)
            .with_beta_2(0.999)
            .with_epsilon(1e-8)
            .init::<TrainingBackend, FlatParameters<TrainingBackend>>(),
        clipping: GradientClippingConfig::Norm(max_norm as f32).init(),
        learning_rate,
        id: ParamId::new(),
        device: NdArrayDevice::Cpu,
        steps: 0,
    }
}

impl<O> Adam<O>
where
    O: Optimizer<FlatParameters<TrainingBackend>, TrainingBackend>,
{
    /// Number of updates applied so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Clips `gradient`, applies one descent update to `parameters` and
    /// returns the gradient norm before clipping.
    pub fn step(&mut self, parameters: &mut [f64], gradient: &[f64]) -> Result<f64, SnlError> {
        let mut clipped = gradient.to_vec();
        let norm = clip_with(&self.clipping, &mut clipped)?;

        let module =
            FlatParameters::<TrainingBackend>::new(self.id.clone(), parameters, &self.device);
        let mut grads = GradientsParams::new();
        grads.register::<ParameterBackend, 1>(
            self.id.clone(),
            flat_tensor::<ParameterBackend>(&clipped, &self.device),
        );
        let module = self.optimizer.step(self.learning_rate, module, grads);
        parameters.copy_from_slice(&module.to_vec()?);
        self.steps += 1;
        Ok(norm)
    }
}
