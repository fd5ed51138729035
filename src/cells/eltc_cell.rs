//! Enhanced Liquid Time-Constant (ELTC) Cell Implementation
//!
//! Conductance-based neuron model from Hasani et al., "Liquid time-constant
//! networks" (AAAI 2021), with a selectable ODE solver. Each neuron obeys
//!
//! ```text
//! cm · dv/dt = gleak · (vleak - v) + Σ_j w_j · σ(σ_j · (v_j - μ_j)) · (erev_j - v)
//! ```
//!
//! where the sum runs over the internal and sensory synapses allowed by the
//! wiring. Synaptic weights, leak conductance and capacitance pass through
//! softplus to stay positive.

use std::fmt;
use std::str::FromStr;

use burn::module::{Module, Param};
use burn::tensor::activation;
use burn::tensor::backend::Backend;
use burn::tensor::{Distribution, ElementConversion, Tensor, TensorData};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::{broadcast_time, RecurrentCell};
use crate::error::{NcpsError, Result};
use crate::wirings::{FullyConnected, Wiring};

/// Input/output mapping modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MappingMode {
    /// Affine mapping: y = w * x + b
    #[default]
    Affine,
    /// Linear mapping: y = w * x
    Linear,
    /// No mapping (pass-through)
    None,
}

/// Integration scheme used for each ODE unfold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OdeSolver {
    /// Fused implicit/explicit Euler step, stable for stiff synapses
    SemiImplicit,
    /// Forward Euler
    #[serde(alias = "euler")]
    Explicit,
    /// Classic fourth-order Runge-Kutta
    #[default]
    #[serde(alias = "rk4")]
    RungeKutta,
}

impl OdeSolver {
    fn code(self) -> u8 {
        match self {
            OdeSolver::SemiImplicit => 0,
            OdeSolver::Explicit => 1,
            OdeSolver::RungeKutta => 2,
        }
    }

    fn from_code(code: u8) -> Self {
        match code {
            0 => OdeSolver::SemiImplicit,
            1 => OdeSolver::Explicit,
            _ => OdeSolver::RungeKutta,
        }
    }
}

impl FromStr for OdeSolver {
    type Err = NcpsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "semi_implicit" | "semi-implicit" => Ok(OdeSolver::SemiImplicit),
            "explicit" | "euler" => Ok(OdeSolver::Explicit),
            "rk4" | "runge_kutta" | "runge-kutta" => Ok(OdeSolver::RungeKutta),
            other => Err(NcpsError::Solver(format!(
                "{other}. Valid options are [\"semi_implicit\", \"explicit\", \"rk4\"]"
            ))),
        }
    }
}

impl fmt::Display for OdeSolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OdeSolver::SemiImplicit => "semi_implicit",
            OdeSolver::Explicit => "explicit",
            OdeSolver::RungeKutta => "rk4",
        })
    }
}

/// Enhanced Liquid Time-Constant cell
#[derive(Debug, Module)]
pub struct EltcCell<B: Backend> {
    /// Leak conductance (softplus applied)
    pub gleak: Param<Tensor<B, 1>>,
    /// Leak reversal potential
    pub vleak: Param<Tensor<B, 1>>,
    /// Membrane capacitance (softplus applied)
    pub cm: Param<Tensor<B, 1>>,
    /// Sigmoid steepness of internal synapses
    pub sigma: Param<Tensor<B, 2>>,
    /// Sigmoid center of internal synapses
    pub mu: Param<Tensor<B, 2>>,
    /// Internal synaptic weights (softplus applied)
    pub w: Param<Tensor<B, 2>>,
    /// Internal reversal potentials, initialized from the wiring polarity
    pub erev: Param<Tensor<B, 2>>,
    pub sensory_sigma: Param<Tensor<B, 2>>,
    pub sensory_mu: Param<Tensor<B, 2>>,
    pub sensory_w: Param<Tensor<B, 2>>,
    pub sensory_erev: Param<Tensor<B, 2>>,
    /// |adjacency|, frozen
    pub sparsity_mask: Param<Tensor<B, 2>>,
    /// |sensory adjacency|, frozen
    pub sensory_sparsity_mask: Param<Tensor<B, 2>>,
    pub input_w: Option<Param<Tensor<B, 1>>>,
    pub input_b: Option<Param<Tensor<B, 1>>>,
    pub output_w: Option<Param<Tensor<B, 1>>>,
    pub output_b: Option<Param<Tensor<B, 1>>>,
    ode_unfolds: usize,
    epsilon: f64,
    solver: u8,
    state_size: usize,
    motor_size: usize,
    sensory_size: usize,
}

impl<B: Backend> EltcCell<B> {
    /// Creates a cell over `wiring`, with affine input and output mappings.
    ///
    /// `sensory_size` may be omitted when the wiring is already built.
    pub fn new(
        wiring: &dyn Wiring,
        sensory_size: Option<usize>,
        device: &B::Device,
    ) -> Result<Self> {
        let state_size = wiring.units();
        let motor_size = wiring.output_dim().unwrap_or(state_size);
        if motor_size > state_size {
            return Err(NcpsError::wiring(format!(
                "wiring has {motor_size} motor neurons but only {state_size} units"
            )));
        }
        let sensory_size = match (sensory_size, wiring.input_dim()) {
            (Some(given), Some(built)) if given != built => {
                return Err(NcpsError::wiring(format!(
                    "sensory size {given} does not match wiring input_dim {built}"
                )))
            }
            (Some(size), _) | (None, Some(size)) => size,
            (None, None) => {
                return Err(NcpsError::wiring(
                    "unknown number of input features; build the wiring or pass sensory_size",
                ))
            }
        };

        let erev_matrix = wiring.erev_initializer();
        let (sensory_erev, sensory_sparsity_mask) = match wiring.sensory_erev_initializer() {
            Some(matrix) => (
                Self::param_from_ndarray(&matrix, false, device),
                Self::frozen(Self::param_from_ndarray(&matrix, true, device)),
            ),
            None => (
                Param::from_tensor(Tensor::ones([sensory_size, state_size], device)),
                Self::frozen(Param::from_tensor(Tensor::ones(
                    [sensory_size, state_size],
                    device,
                ))),
            ),
        };

        let cell = Self {
            gleak: Self::init_param([state_size], 0.001, 1.0, device),
            vleak: Self::init_param([state_size], -0.2, 0.2, device),
            cm: Self::init_param([state_size], 0.4, 0.6, device),
            sigma: Self::init_param([state_size, state_size], 3.0, 8.0, device),
            mu: Self::init_param([state_size, state_size], 0.3, 0.8, device),
            w: Self::init_param([state_size, state_size], 0.001, 1.0, device),
            erev: Self::param_from_ndarray(&erev_matrix, false, device),
            sensory_sigma: Self::init_param([sensory_size, state_size], 3.0, 8.0, device),
            sensory_mu: Self::init_param([sensory_size, state_size], 0.3, 0.8, device),
            sensory_w: Self::init_param([sensory_size, state_size], 0.001, 1.0, device),
            sensory_erev,
            sparsity_mask: Self::frozen(Self::param_from_ndarray(&erev_matrix, true, device)),
            sensory_sparsity_mask,
            input_w: None,
            input_b: None,
            output_w: None,
            output_b: None,
            ode_unfolds: 6,
            epsilon: 1e-8,
            solver: OdeSolver::default().code(),
            state_size,
            motor_size,
            sensory_size,
        };

        Ok(cell
            .with_input_mapping(MappingMode::Affine, device)
            .with_output_mapping(MappingMode::Affine, device))
    }

    /// Builds its own fully connected wiring of `hidden_size` units.
    pub fn fully_connected(
        input_size: usize,
        hidden_size: usize,
        output_dim: Option<usize>,
        seed: u64,
        device: &B::Device,
    ) -> Result<Self> {
        let mut wiring = FullyConnected::new(hidden_size, output_dim, seed, true);
        wiring.build(input_size)?;
        Self::new(&wiring, Some(input_size), device)
    }

    fn param_from_ndarray(arr: &Array2<i32>, abs: bool, device: &B::Device) -> Param<Tensor<B, 2>> {
        let shape = arr.shape();
        let data: Vec<f32> = arr
            .iter()
            .map(|&x| if abs { x.abs() as f32 } else { x as f32 })
            .collect();
        let data = TensorData::new(data, [shape[0], shape[1]]);
        Param::from_tensor(Tensor::from_data(data, device))
    }

    fn frozen<const D: usize>(param: Param<Tensor<B, D>>) -> Param<Tensor<B, D>> {
        param.set_require_grad(false)
    }

    fn init_param<const D: usize>(
        shape: [usize; D],
        min: f64,
        max: f64,
        device: &B::Device,
    ) -> Param<Tensor<B, D>> {
        Param::from_tensor(Tensor::random(shape, Distribution::Uniform(min, max), device))
    }

    pub fn with_ode_unfolds(mut self, unfolds: usize) -> Self {
        self.ode_unfolds = unfolds.max(1);
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_solver(mut self, solver: OdeSolver) -> Self {
        self.solver = solver.code();
        self
    }

    /// Set input mapping mode (affine, linear, or none)
    pub fn with_input_mapping(mut self, mode: MappingMode, device: &B::Device) -> Self {
        let (w, b) = Self::mapping_params(mode, self.sensory_size, device);
        self.input_w = w;
        self.input_b = b;
        self
    }

    /// Set output mapping mode (affine, linear, or none)
    pub fn with_output_mapping(mut self, mode: MappingMode, device: &B::Device) -> Self {
        let (w, b) = Self::mapping_params(mode, self.motor_size, device);
        self.output_w = w;
        self.output_b = b;
        self
    }

    #[allow(clippy::type_complexity)]
    fn mapping_params(
        mode: MappingMode,
        size: usize,
        device: &B::Device,
    ) -> (Option<Param<Tensor<B, 1>>>, Option<Param<Tensor<B, 1>>>) {
        let weight = || Some(Param::from_tensor(Tensor::ones([size], device)));
        match mode {
            MappingMode::Affine => (
                weight(),
                Some(Param::from_tensor(Tensor::zeros([size], device))),
            ),
            MappingMode::Linear => (weight(), None),
            MappingMode::None => (None, None),
        }
    }

    pub fn state_size(&self) -> usize {
        self.state_size
    }

    pub fn motor_size(&self) -> usize {
        self.motor_size
    }

    pub fn sensory_size(&self) -> usize {
        self.sensory_size
    }

    pub fn ode_unfolds(&self) -> usize {
        self.ode_unfolds
    }

    pub fn solver(&self) -> OdeSolver {
        OdeSolver::from_code(self.solver)
    }

    /// Synapses allowed by the wiring
    pub fn synapse_count(&self) -> usize {
        self.sparsity_mask.val().sum().into_scalar().elem::<f64>() as usize
    }

    pub fn sensory_synapse_count(&self) -> usize {
        self.sensory_sparsity_mask.val().sum().into_scalar().elem::<f64>() as usize
    }

    fn map_inputs(&self, inputs: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut result = inputs;
        if let Some(ref w) = self.input_w {
            result = result.mul(w.val().unsqueeze::<2>());
        }
        if let Some(ref b) = self.input_b {
            result = result.add(b.val().unsqueeze::<2>());
        }
        result
    }

    fn map_outputs(&self, state: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut output = state.narrow(1, 0, self.motor_size);
        if let Some(ref w) = self.output_w {
            output = output.mul(w.val().unsqueeze::<2>());
        }
        if let Some(ref b) = self.output_b {
            output = output.add(b.val().unsqueeze::<2>());
        }
        output
    }

    /// Weighted synapse openings `[batch, pre, post]` for presynaptic potentials `pre`.
    fn synapse_activation(
        pre: Tensor<B, 2>,
        mu: Tensor<B, 2>,
        sigma: Tensor<B, 2>,
        weight: Tensor<B, 2>,
    ) -> Tensor<B, 3> {
        let [batch, n_pre] = pre.dims();
        let [_, n_post] = mu.dims();
        let shape = [batch, n_pre, n_post];

        let pre = pre.reshape([batch, n_pre, 1]).expand(shape);
        let gate = activation::sigmoid(
            sigma.unsqueeze::<3>().expand(shape) * (pre - mu.unsqueeze::<3>().expand(shape)),
        );
        gate * weight.unsqueeze::<3>().expand(shape)
    }

    /// Sums `(Σ w·σ·erev, Σ w·σ)` over the presynaptic axis.
    fn reduce_currents(opening: Tensor<B, 3>, erev: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let [batch, _, n_post] = opening.dims();
        let erev = erev.unsqueeze::<3>().expand(opening.dims());
        let numerator = (opening.clone() * erev).sum_dim(1).reshape([batch, n_post]);
        let denominator = opening.sum_dim(1).reshape([batch, n_post]);
        (numerator, denominator)
    }

    fn ode_solver(
        &self,
        inputs: Tensor<B, 2>,
        state: Tensor<B, 2>,
        elapsed_time: Tensor<B, 1>,
    ) -> Tensor<B, 2> {
        let [batch, state_size] = state.dims();
        let shape = [batch, state_size];

        let cm = activation::softplus(self.cm.val(), 1.0)
            .unsqueeze::<2>()
            .expand(shape);
        let gleak = activation::softplus(self.gleak.val(), 1.0)
            .unsqueeze::<2>()
            .expand(shape);
        let vleak = self.vleak.val().unsqueeze::<2>().expand(shape);
        let dt = broadcast_time(elapsed_time, state_size).div_scalar(self.ode_unfolds as f64);

        // Sensory drive does not depend on v and is shared by every unfold.
        let sensory_weight =
            activation::softplus(self.sensory_w.val(), 1.0) * self.sensory_sparsity_mask.val();
        let (sensory_num, sensory_den) = Self::reduce_currents(
            Self::synapse_activation(
                inputs,
                self.sensory_mu.val(),
                self.sensory_sigma.val(),
                sensory_weight,
            ),
            self.sensory_erev.val(),
        );

        let weight = activation::softplus(self.w.val(), 1.0) * self.sparsity_mask.val();
        let currents = |v: &Tensor<B, 2>| {
            let (num, den) = Self::reduce_currents(
                Self::synapse_activation(v.clone(), self.mu.val(), self.sigma.val(), weight.clone()),
                self.erev.val(),
            );
            (num + sensory_num.clone(), den + sensory_den.clone())
        };
        let derivative = |v: &Tensor<B, 2>| {
            let (num, den) = currents(v);
            let leak = gleak.clone() * (vleak.clone() - v.clone());
            (leak + num - den * v.clone()) / cm.clone()
        };

        let mut v = state;
        match self.solver() {
            OdeSolver::SemiImplicit => {
                let cm_t = cm.clone() / dt.clone();
                for _ in 0..self.ode_unfolds {
                    let (num, den) = currents(&v);
                    let numerator = cm_t.clone() * v + gleak.clone() * vleak.clone() + num;
                    let denominator = (cm_t.clone() + gleak.clone() + den).add_scalar(self.epsilon);
                    v = numerator / denominator;
                }
            }
            OdeSolver::Explicit => {
                for _ in 0..self.ode_unfolds {
                    v = v.clone() + dt.clone() * derivative(&v);
                }
            }
            OdeSolver::RungeKutta => {
                let half = dt.clone().div_scalar(2.0);
                for _ in 0..self.ode_unfolds {
                    let k1 = derivative(&v);
                    let k2 = derivative(&(v.clone() + half.clone() * k1.clone()));
                    let k3 = derivative(&(v.clone() + half.clone() * k2.clone()));
                    let k4 = derivative(&(v.clone() + dt.clone() * k3.clone()));
                    let slope = (k1 + k2.mul_scalar(2.0) + k3.mul_scalar(2.0) + k4).div_scalar(6.0);
                    v = v + dt.clone() * slope;
                }
            }
        }

        v
    }

    pub fn forward(
        &self,
        inputs: Tensor<B, 2>,
        states: Tensor<B, 2>,
        elapsed_time: Tensor<B, 1>,
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let mapped_inputs = self.map_inputs(inputs);
        let new_states = self.ode_solver(mapped_inputs, states, elapsed_time);
        let output = self.map_outputs(new_states.clone());
        (output, new_states)
    }
}

impl<B: Backend> RecurrentCell<B> for EltcCell<B> {
    fn input_size(&self) -> usize {
        self.sensory_size
    }

    fn state_size(&self) -> usize {
        self.state_size
    }

    fn output_size(&self) -> usize {
        self.motor_size
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
