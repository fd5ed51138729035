//! CT-RNN sequence layer.

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::{unroll, SequenceModel};
use crate::activation::Activation;
use crate::cells::CtrnnCell;

#[derive(Module, Debug)]
pub struct Ctrnn<B: Backend> {
    cell: CtrnnCell<B>,
    proj: Option<Linear<B>>,
    batch_first: bool,
    return_sequences: bool,
    output_size: usize,
}

impl<B: Backend> Ctrnn<B> {
    pub fn new(input_size: usize, units: usize, device: &B::Device) -> Self {
        Self {
            cell: CtrnnCell::new(input_size, units, device),
            proj: None,
            batch_first: true,
            return_sequences: true,
            output_size: units,
        }
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.cell = self.cell.with_activation(activation);
        self
    }

    pub fn with_cell_clip(mut self, clip: Option<f64>) -> Self {
        self.cell = self.cell.with_cell_clip(clip);
        self
    }

    pub fn with_unfolds(mut self, unfolds: usize) -> Self {
        self.cell = self.cell.with_unfolds(unfolds);
        self
    }

    pub fn with_global_feedback(mut self, global_feedback: bool) -> Self {
        self.cell = self.cell.with_global_feedback(global_feedback);
        self
    }

    pub fn with_batch_first(mut self, batch_first: bool) -> Self {
        self.batch_first = batch_first;
        self
    }

    pub fn with_return_sequences(mut self, return_sequences: bool) -> Self {
        self.return_sequences = return_sequences;
        self
    }

    pub fn with_proj_size(mut self, proj_size: usize, device: &B::Device) -> Self {
        self.proj = Some(LinearConfig::new(self.cell.units(), proj_size).init(device));
        self.output_size = proj_size;
        self
    }

    pub fn cell(&self) -> &CtrnnCell<B> {
        &self.cell
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    /// See [`crate::rnn`] for the tensor layouts.
    pub fn forward(
        &self,
        input: Tensor<B, 3>,
        state: Option<Tensor<B, 2>>,
        timespans: Option<Tensor<B, 2>>,
    ) -> (Tensor<B, 3>, Tensor<B, 2>) {
        unroll(
            &self.cell,
            self.proj.as_ref(),
            input,
            state,
            timespans,
            self.batch_first,
            self.return_sequences,
        )
    }
}

impl<B: Backend> SequenceModel<B> for Ctrnn<B> {
    fn forward_sequence(
        &self,
        input: Tensor<B, 3>,
        time_deltas: Option<Tensor<B, 2>>,
    ) -> Tensor<B, 3> {
        self.forward(input, None, time_deltas).0
    }
}
