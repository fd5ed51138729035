//! Closed-form Continuous-time (CfC) Cell Implementation
//!
//! The CfC cell is a fast approximation of the LTC (Liquid Time-Constant) cell.
//! It provides closed-form solutions to continuous-time neural dynamics without
//! requiring iterative ODE solvers.
//!
//! Three modes are supported:
//! - **Default**: Gated interpolation between two feedforward paths
//! - **Pure**: Direct ODE solution without gating
//! - **NoGate**: Simplified gating with addition instead of interpolation
//!
//! An optional backbone (stack of dense layers with dropout) transforms the
//! concatenated input and state before the heads.

use std::fmt;
use std::str::FromStr;

use burn::module::{Module, Param};
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig};
use burn::tensor::activation;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use super::{broadcast_time, RecurrentCell};
use crate::activation::Activation;
use crate::error::NcpsError;

/// CfC cell operating modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CfcMode {
    /// Default gated mode: h = tanh(ff1) * (1 - σ) + tanh(ff2) * σ
    #[default]
    #[serde(alias = "gated")]
    Default,
    /// Pure ODE solution without gating
    Pure,
    /// No-gate mode: h = tanh(ff1) + tanh(ff2) * σ
    NoGate,
}

impl CfcMode {
    fn code(self) -> u8 {
        match self {
            CfcMode::Default => 0,
            CfcMode::Pure => 1,
            CfcMode::NoGate => 2,
        }
    }

    fn from_code(code: u8) -> Self {
        match code {
            1 => CfcMode::Pure,
            2 => CfcMode::NoGate,
            _ => CfcMode::Default,
        }
    }
}

impl FromStr for CfcMode {
    type Err = NcpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" | "gated" => Ok(CfcMode::Default),
            "pure" => Ok(CfcMode::Pure),
            "no_gate" | "nogate" => Ok(CfcMode::NoGate),
            other => Err(NcpsError::Mode(format!(
                "{other}. Valid options are [\"default\", \"gated\", \"pure\", \"no_gate\"]"
            ))),
        }
    }
}

impl fmt::Display for CfcMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CfcMode::Default => "default",
            CfcMode::Pure => "pure",
            CfcMode::NoGate => "no_gate",
        })
    }
}

/// A Closed-form Continuous-time cell
///
/// Processes single time-steps; see [`crate::rnn::CfC`] for sequences.
#[derive(Module, Debug)]
pub struct CfCCell<B: Backend> {
    input_size: usize,
    hidden_size: usize,
    /// Encoded [`CfcMode`]
    mode: u8,
    /// Encoded backbone [`Activation`]
    activation: u8,
    backbone_units: usize,
    backbone_layers: usize,
    backbone_dropout: f64,
    backbone: Vec<Linear<B>>,
    dropout: Dropout,
    ff1: Linear<B>,
    ff2: Option<Linear<B>>,
    time_a: Option<Linear<B>>,
    time_b: Option<Linear<B>>,
    w_tau: Option<Param<Tensor<B, 2>>>,
    a: Option<Param<Tensor<B, 2>>>,
}

impl<B: Backend> CfCCell<B> {
    /// Create a new CfC cell in default mode without a backbone
    pub fn new(input_size: usize, hidden_size: usize, device: &B::Device) -> Self {
        Self::build(
            input_size,
            hidden_size,
            CfcMode::Default,
            Activation::LeCunTanh,
            (0, 0, 0.0),
            device,
        )
    }

    fn build(
        input_size: usize,
        hidden_size: usize,
        mode: CfcMode,
        backbone_activation: Activation,
        (backbone_units, backbone_layers, backbone_dropout): (usize, usize, f64),
        device: &B::Device,
    ) -> Self {
        let cat_size = input_size + hidden_size;

        let mut backbone = Vec::with_capacity(backbone_layers);
        for layer in 0..backbone_layers {
            let d_in = if layer == 0 { cat_size } else { backbone_units };
            backbone.push(LinearConfig::new(d_in, backbone_units).init(device));
        }
        let head_in = if backbone_layers > 0 {
            backbone_units
        } else {
            cat_size
        };

        let linear = || LinearConfig::new(head_in, hidden_size).init(device);
        let gated = mode != CfcMode::Pure;

        Self {
            input_size,
            hidden_size,
            mode: mode.code(),
            activation: backbone_activation.code(),
            backbone_units,
            backbone_layers,
            backbone_dropout,
            backbone,
            dropout: DropoutConfig::new(backbone_dropout).init(),
            ff1: linear(),
            ff2: gated.then(linear),
            time_a: gated.then(linear),
            time_b: gated.then(linear),
            w_tau: (!gated).then(|| Param::from_tensor(Tensor::zeros([1, hidden_size], device))),
            a: (!gated).then(|| Param::from_tensor(Tensor::ones([1, hidden_size], device))),
        }
    }

    fn rebuild(self) -> Self {
        let device = self.ff1.weight.device();
        Self::build(
            self.input_size,
            self.hidden_size,
            self.mode(),
            self.backbone_activation(),
            (
                self.backbone_units,
                self.backbone_layers,
                self.backbone_dropout,
            ),
            &device,
        )
    }

    /// Set the CfC mode (Default, Pure, or NoGate). Re-initializes the weights.
    pub fn with_mode(mut self, mode: CfcMode) -> Self {
        self.mode = mode.code();
        self.rebuild()
    }

    /// Configure the backbone. `layers == 0` disables it. Re-initializes the weights.
    pub fn with_backbone(mut self, units: usize, layers: usize, dropout: f64) -> Self {
        self.backbone_units = units;
        self.backbone_layers = if units == 0 { 0 } else { layers };
        self.backbone_dropout = dropout;
        self.rebuild()
    }

    /// Set the backbone activation
    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation.code();
        self
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn mode(&self) -> CfcMode {
        CfcMode::from_code(self.mode)
    }

    pub fn backbone_activation(&self) -> Activation {
        Activation::from_code(self.activation)
    }

    pub fn backbone_layers(&self) -> usize {
        self.backbone.len()
    }

    /// Perform a forward pass through the CfC cell
    ///
    /// `ts` holds the elapsed time of each batch entry.
    pub fn forward(
        &self,
        input: Tensor<B, 2>,
        hx: Tensor<B, 2>,
        ts: Tensor<B, 1>,
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let mut x = Tensor::cat(vec![input, hx], 1);

        let act = self.backbone_activation();
        for layer in &self.backbone {
            x = self.dropout.forward(act.apply(layer.forward(x)));
        }

        let ff1 = self.ff1.forward(x.clone());
        let ts = broadcast_time(ts, self.hidden_size);

        let new_hidden = match (&self.w_tau, &self.a) {
            (Some(w_tau), Some(a)) => {
                let [batch, hidden] = ff1.dims();
                let w_tau = w_tau.val().expand([batch, hidden]);
                let a = a.val().expand([batch, hidden]);

                let decay = (ts * (w_tau.abs() + ff1.clone().abs())).neg().exp();
                a.clone() - a * decay * ff1
            }
            _ => {
                let (ff2, time_a, time_b) = match (&self.ff2, &self.time_a, &self.time_b) {
                    (Some(ff2), Some(time_a), Some(time_b)) => (ff2, time_a, time_b),
                    _ => unreachable!("gated CfC modes always carry ff2 and time heads"),
                };
                let ff1 = ff1.tanh();
                let ff2 = ff2.forward(x.clone()).tanh();
                let t_a = time_a.forward(x.clone());
                let t_b = time_b.forward(x);
                let t_interp = activation::sigmoid(t_a * ts + t_b);

                if self.mode() == CfcMode::NoGate {
                    ff1 + t_interp * ff2
                } else {
                    ff1 * (t_interp.clone().neg() + 1.0) + t_interp * ff2
                }
            }
        };

        (new_hidden.clone(), new_hidden)
    }
}

impl<B: Backend> RecurrentCell<B> for CfCCell<B> {
    fn input_size(&self) -> usize {
        self.input_size
    }

    fn state_size(&self) -> usize {
        self.hidden_size
    }

    fn output_size(&self) -> usize {
        self.hidden_size
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

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::backend::Backend as BurnBackend;

    type TestBackend = NdArray<f32>;
    type TestDevice = <TestBackend as BurnBackend>::Device;

    fn get_test_device() -> TestDevice {
        Default::default()
    }

    fn ones_time(batch: usize) -> Tensor<TestBackend, 1> {
        Tensor::ones([batch], &get_test_device())
    }

    #[test]
    fn test_cfc_cell_creation() {
        let device = get_test_device();
        let cell = CfCCell::<TestBackend>::new(20, 50, &device);

        assert_eq!(cell.input_size(), 20);
        assert_eq!(cell.hidden_size(), 50);
        assert_eq!(cell.mode(), CfcMode::Default);
        assert_eq!(cell.backbone_layers(), 0);
    }

    #[test]
    fn test_pure_mode_at_zero_time_returns_a_minus_a_ff1() {
        // With t = 0 the decay term is 1, so h = a - a * ff1 = 1 - ff1 for a = 1.
        let device = get_test_device();
        let cell = CfCCell::<TestBackend>::new(3, 4, &device).with_mode(CfcMode::Pure);

        let input = Tensor::<TestBackend, 2>::zeros([2, 3], &device);
        let hx = Tensor::<TestBackend, 2>::zeros([2, 4], &device);
        let ts = Tensor::<TestBackend, 1>::zeros([2], &device);

        let x = Tensor::cat(vec![input.clone(), hx.clone()], 1);
        let ff1 = cell.ff1.forward(x);
        let (out, _) = cell.forward(input, hx, ts);

        let expected = ff1.neg() + 1.0;
        let diff = (out - expected).abs().max().into_scalar();
        assert!(diff < 1e-5);
    }

    #[test]
    fn test_mode_switch_swaps_parameters() {
        let device = get_test_device();
        let cell = CfCCell::<TestBackend>::new(4, 6, &device).with_mode(CfcMode::Pure);
        assert!(cell.ff2.is_none());
        assert!(cell.w_tau.is_some());

        let cell = cell.with_mode(CfcMode::NoGate);
        assert!(cell.ff2.is_some());
        assert!(cell.w_tau.is_none());
        assert_eq!(cell.mode(), CfcMode::NoGate);
    }

    #[test]
    fn test_backbone_changes_head_width() {
        let device = get_test_device();
        let cell = CfCCell::<TestBackend>::new(16, 32, &device).with_backbone(64, 2, 0.1);

        assert_eq!(cell.backbone_layers(), 2);
        assert_eq!(cell.ff1.weight.val().dims(), [64, 32]);

        let (out, _) = cell.forward(
            Tensor::zeros([5, 16], &device),
            Tensor::zeros([5, 32], &device),
            ones_time(5),
        );
        assert_eq!(out.dims(), [5, 32]);
    }

    #[test]
    fn test_zero_backbone_units_disables_backbone() {
        let device = get_test_device();
        let cell = CfCCell::<TestBackend>::new(4, 8, &device).with_backbone(0, 3, 0.0);
        assert_eq!(cell.backbone_layers(), 0);
    }

    #[test]
    fn test_elapsed_time_changes_gated_output() {
        let device = get_test_device();
        let cell = CfCCell::<TestBackend>::new(4, 8, &device);

        let input = Tensor::<TestBackend, 2>::random(
            [1, 4],
            burn::tensor::Distribution::Uniform(-1.0, 1.0),
            &device,
        );
        let hx = Tensor::<TestBackend, 2>::zeros([1, 8], &device);

        let (short, _) = cell.forward(
            input.clone(),
            hx.clone(),
            Tensor::from_floats([0.1f32], &device),
        );
        let (long, _) = cell.forward(input, hx, Tensor::from_floats([10.0f32], &device));

        let diff = (short - long).abs().sum().into_scalar();
        assert!(diff > 0.0);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("pure".parse::<CfcMode>().unwrap(), CfcMode::Pure);
        assert_eq!("no_gate".parse::<CfcMode>().unwrap(), CfcMode::NoGate);
        assert_eq!("gated".parse::<CfcMode>().unwrap(), CfcMode::Default);
        assert!("gate".parse::<CfcMode>().is_err());
        assert_eq!(CfcMode::NoGate.to_string(), "no_gate");
    }
}
