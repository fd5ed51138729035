//! Gradient clipping over a whole module.
//!
//! Burn's built-in clipping works per parameter; the norm here is the L2
//! norm over every gradient of the model at once.

use std::marker::PhantomData;

use burn::module::{AutodiffModule, ModuleVisitor, ParamId};
use burn::optim::GradientsParams;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{ElementConversion, Tensor};

struct SquaredNorm<'a, B: AutodiffBackend> {
    grads: &'a GradientsParams,
    total: f64,
    phantom: PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for SquaredNorm<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.get::<B::InnerBackend, D>(id) {
            self.total += grad.powf_scalar(2.0).sum().into_scalar().elem::<f64>();
        }
    }
}

struct Rescale<'a, B: AutodiffBackend> {
    grads: &'a mut GradientsParams,
    scale: Option<f64>,
    clamp: Option<f64>,
    phantom: PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for Rescale<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(mut grad) = self.grads.remove::<B::InnerBackend, D>(id) {
            if let Some(scale) = self.scale {
                grad = grad.mul_scalar(scale);
            }
            if let Some(limit) = self.clamp {
                grad = grad.clamp(-limit, limit);
            }
            self.grads.register(id, grad);
        }
    }
}

/// L2 norm over every gradient of `module`.
pub fn global_grad_norm<B, M>(module: &M, grads: &GradientsParams) -> f64
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    let mut visitor = SquaredNorm::<B> {
        grads,
        total: 0.0,
        phantom: PhantomData,
    };
    module.visit(&mut visitor);
    visitor.total.sqrt()
}

/// Scales all gradients by `max_norm / (norm + 1e-6)` when their global norm
/// exceeds `max_norm`, then clamps each element to `[-max_value, max_value]`.
///
/// Returns the global norm measured before clipping.
pub fn clip_gradients<B, M>(
    module: &M,
    grads: &mut GradientsParams,
    max_norm: Option<f64>,
    max_value: Option<f64>,
) -> f64
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    let norm = global_grad_norm::<B, M>(module, grads);
    let scale = max_norm
        .filter(|max_norm| norm > *max_norm)
        .map(|max_norm| max_norm / (norm + 1e-6));

    if scale.is_some() || max_value.is_some() {
        let mut visitor = Rescale::<B> {
            grads,
            scale,
            clamp: max_value,
            phantom: PhantomData,
        };
        module.visit(&mut visitor);
    }
    norm
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::nn::{Linear, LinearConfig};

    type Backend = Autodiff<NdArray<f32>>;

    fn grads_for(model: &Linear<Backend>, scale: f32) -> GradientsParams {
        let device = Default::default();
        let input = Tensor::<Backend, 2>::ones([4, 3], &device).mul_scalar(scale);
        let loss = model.forward(input).powf_scalar(2.0).sum();
        GradientsParams::from_grads(loss.backward(), model)
    }

    #[test]
    fn test_norm_is_capped() {
        let device = Default::default();
        let model = LinearConfig::new(3, 2).init::<Backend>(&device);
        let mut grads = grads_for(&model, 50.0);

        let before = clip_gradients::<Backend, _>(&model, &mut grads, Some(0.1), None);
        let after = global_grad_norm::<Backend, _>(&model, &grads);

        assert!(before > 0.1);
        assert!(after <= 0.1 + 1e-4, "norm after clipping was {after}");
    }

    #[test]
    fn test_small_gradients_untouched() {
        let device = Default::default();
        let model = LinearConfig::new(3, 2).init::<Backend>(&device);
        let mut grads = grads_for(&model, 1e-3);

        let before = clip_gradients::<Backend, _>(&model, &mut grads, Some(1e6), None);
        let after = global_grad_norm::<Backend, _>(&model, &grads);
        assert!((before - after).abs() < 1e-9);
    }

    #[test]
    fn test_value_clamp() {
        let device = Default::default();
        let model = LinearConfig::new(3, 2).init::<Backend>(&device);
        let mut grads = grads_for(&model, 50.0);

        clip_gradients::<Backend, _>(&model, &mut grads, None, Some(0.01));

        let weight_grad = grads
            .get::<NdArray<f32>, 2>(model.weight.id)
            .expect("weight gradient");
        let max = weight_grad.abs().max().into_scalar();
        assert!(max <= 0.01 + 1e-7);
    }
}
