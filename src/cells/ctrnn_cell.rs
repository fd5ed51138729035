//! Continuous-time RNN (CT-RNN) cell.
//!
//! Integrates `dh/dt = -h / τ + f(W · [x, h] + b)` with explicit Euler
//! steps. The elapsed time of each sample is split evenly over `unfolds`
//! steps; an optional clip bounds the state after every step.

use burn::module::{Module, Param};
use burn::nn::{Linear, LinearConfig};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::{broadcast_time, RecurrentCell};
use crate::activation::Activation;

#[derive(Module, Debug)]
pub struct CtrnnCell<B: Backend> {
    input_size: usize,
    units: usize,
    activation: u8,
    /// Non-positive disables clipping
    cell_clip: f64,
    global_feedback: bool,
    unfolds: usize,
    /// Fixed time constant, used when `tau_raw` is absent
    tau: f64,
    /// Learnable time constant, passed through softplus to stay positive
    tau_raw: Option<Param<Tensor<B, 1>>>,
    step_layer: Linear<B>,
}

impl<B: Backend> CtrnnCell<B> {
    /// Tanh activation, global feedback, 6 unfolds, τ = 1, no clipping.
    pub fn new(input_size: usize, units: usize, device: &B::Device) -> Self {
        Self {
            input_size,
            units,
            activation: Activation::Tanh.code(),
            cell_clip: 0.0,
            global_feedback: true,
            unfolds: 6,
            tau: 1.0,
            tau_raw: None,
            step_layer: LinearConfig::new(input_size + units, units).init(device),
        }
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation.code();
        self
    }

    pub fn with_cell_clip(mut self, clip: Option<f64>) -> Self {
        self.cell_clip = clip.filter(|c| *c > 0.0).unwrap_or(0.0);
        self
    }

    pub fn with_unfolds(mut self, unfolds: usize) -> Self {
        self.unfolds = unfolds.max(1);
        self
    }

    /// Without global feedback the drive term only sees the input, and is
    /// computed once per step instead of once per unfold.
    pub fn with_global_feedback(mut self, global_feedback: bool) -> Self {
        if global_feedback != self.global_feedback {
            let device = self.step_layer.weight.device();
            let d_in = if global_feedback {
                self.input_size + self.units
            } else {
                self.input_size
            };
            self.step_layer = LinearConfig::new(d_in, self.units).init(&device);
            self.global_feedback = global_feedback;
        }
        self
    }

    /// Fixed time constant, or a learnable one starting at `tau` when `learnable`.
    pub fn with_tau(mut self, tau: f64, learnable: bool) -> Self {
        self.tau = tau;
        self.tau_raw = if learnable {
            let device = self.step_layer.weight.device();
            // Inverse softplus so the effective constant starts at `tau`.
            let raw = tau.exp_m1().ln() as f32;
            Some(Param::from_tensor(Tensor::from_floats([raw], &device)))
        } else {
            None
        };
        self
    }

    pub fn units(&self) -> usize {
        self.units
    }

    pub fn activation(&self) -> Activation {
        Activation::from_code(self.activation)
    }

    pub fn cell_clip(&self) -> Option<f64> {
        (self.cell_clip > 0.0).then_some(self.cell_clip)
    }

    fn drive(&self, input: Tensor<B, 2>, state: Option<Tensor<B, 2>>) -> Tensor<B, 2> {
        let x = match state {
            Some(state) => Tensor::cat(vec![input, state], 1),
            None => input,
        };
        self.activation().apply(self.step_layer.forward(x))
    }

    pub fn forward(
        &self,
        input: Tensor<B, 2>,
        state: Tensor<B, 2>,
        elapsed: Tensor<B, 1>,
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let [batch, units] = state.dims();
        let dt = broadcast_time(elapsed, units).div_scalar(self.unfolds as f64);

        let inv_tau = match &self.tau_raw {
            Some(raw) => {
                let tau = raw.val().exp().add_scalar(1.0).log();
                tau.recip().unsqueeze::<2>().expand([batch, units])
            }
            None => Tensor::ones([batch, units], &state.device()).div_scalar(self.tau),
        };

        let open_loop = (!self.global_feedback).then(|| self.drive(input.clone(), None));

        let mut state = state;
        for _ in 0..self.unfolds {
            let drive = match &open_loop {
                Some(drive) => drive.clone(),
                None => self.drive(input.clone(), Some(state.clone())),
            };
            let f_prime = drive - state.clone() * inv_tau.clone();
            state = state + dt.clone() * f_prime;

            if let Some(clip) = self.cell_clip() {
                state = state.clamp(-clip, clip);
            }
        }

        (state.clone(), state)
    }
}

impl<B: Backend> RecurrentCell<B> for CtrnnCell<B> {
    fn input_size(&self) -> usize {
        self.input_size
    }

    fn state_size(&self) -> usize {
        self.units
    }

    fn output_size(&self) -> usize {
        self.units
    }

    fn step(
        &self,
        input: Tensor<B, 2>,
        state: Tensor<B, 2>,
        elapsed: Tensor<B, 1>,
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        self.forward(input, state, elapsed)
    }
}
