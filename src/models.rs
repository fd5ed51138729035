//! Composite models built from the sequence layers.

use burn::module::Module;
use burn::nn::loss::{MseLoss, Reduction};
use burn::nn::{Linear, LinearConfig};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::activation::Activation;
use crate::cells::CfcMode;
use crate::rnn::{CfC, SequenceModel};

/// A CfC layer read out at the last step, followed by a linear head.
#[derive(Module, Debug)]
pub struct LiquidRegressor<B: Backend> {
    rnn: CfC<B>,
    head: Linear<B>,
}

impl<B: Backend> LiquidRegressor<B> {
    pub fn new(input_dim: usize, hidden_dim: usize, output_dim: usize, device: &B::Device) -> Self {
        Self {
            rnn: CfC::new(input_dim, hidden_dim, device).with_return_sequences(false),
            head: LinearConfig::new(hidden_dim, output_dim).init(device),
        }
    }

    pub fn with_mode(mut self, mode: CfcMode) -> Self {
        self.rnn = self.rnn.with_mode(mode);
        self
    }

    pub fn with_backbone(mut self, units: usize, layers: usize, dropout: f64) -> Self {
        self.rnn = self.rnn.with_backbone(units, layers, dropout);
        self
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.rnn = self.rnn.with_activation(activation);
        self
    }

    pub fn rnn(&self) -> &CfC<B> {
        &self.rnn
    }

    /// `inputs` is `[n, seq_len, input_dim]`, `times` is `[n, seq_len, 1]`.
    ///
    /// Returns `[n, output_dim]`.
    pub fn forward(&self, inputs: Tensor<B, 3>, times: Tensor<B, 3>) -> Tensor<B, 2> {
        let [n, seq_len, _] = times.dims();
        self.predict(inputs, times.reshape([n, seq_len]))
    }

    fn predict(&self, inputs: Tensor<B, 3>, time_deltas: Tensor<B, 2>) -> Tensor<B, 2> {
        let (last, _) = self.rnn.forward(inputs, None, Some(time_deltas));
        self.head.forward(last.squeeze::<2>(1))
    }
}

impl<B: Backend> SequenceModel<B> for LiquidRegressor<B> {
    fn forward_sequence(
        &self,
        input: Tensor<B, 3>,
        time_deltas: Option<Tensor<B, 2>>,
    ) -> Tensor<B, 3> {
        let [n, seq_len, _] = input.dims();
        let time_deltas =
            time_deltas.unwrap_or_else(|| Tensor::ones([n, seq_len], &input.device()));
        self.predict(input, time_deltas).unsqueeze_dim(1)
    }
}

/// Mean squared error over every element.
pub fn mse<B: Backend, const D: usize>(pred: Tensor<B, D>, target: Tensor<B, D>) -> Tensor<B, 1> {
    MseLoss::new().forward(pred, target, Reduction::Mean)
}
