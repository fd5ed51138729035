//! Closed-form Continuous-time (CfC) RNN Layer
//!
//! Full RNN layer that handles sequence processing, batching, and state management
//! for CfC (Closed-form Continuous-time) cells.

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::{unroll, SequenceModel};
use crate::activation::Activation;
use crate::cells::{CfCCell, CfcMode};

/// CfC RNN Layer
///
/// Supports batching, state management, the three CfC modes, a dense
/// backbone and an optional output projection.
#[derive(Module, Debug)]
pub struct CfC<B: Backend> {
    cell: CfCCell<B>,
    proj: Option<Linear<B>>,
    input_size: usize,
    hidden_size: usize,
    batch_first: bool,
    return_sequences: bool,
    /// hidden_size, or the projection size when one is set
    output_size: usize,
}

impl<B: Backend> CfC<B> {
    /// Create a new CfC RNN layer
    ///
    /// # Arguments
    /// * `input_size` - Number of input features
    /// * `hidden_size` - Number of hidden units
    /// * `device` - Device to create the module on
    pub fn new(input_size: usize, hidden_size: usize, device: &B::Device) -> Self {
        Self {
            cell: CfCCell::new(input_size, hidden_size, device),
            proj: None,
            input_size,
            hidden_size,
            batch_first: true,
            return_sequences: true,
            output_size: hidden_size,
        }
    }

    pub fn with_mode(mut self, mode: CfcMode) -> Self {
        self.cell = self.cell.with_mode(mode);
        self
    }

    /// Dense backbone applied before the CfC heads
    pub fn with_backbone(mut self, units: usize, layers: usize, dropout: f64) -> Self {
        self.cell = self.cell.with_backbone(units, layers, dropout);
        self
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.cell = self.cell.with_activation(activation);
        self
    }

    /// Set whether input is batch-first (default: true)
    pub fn with_batch_first(mut self, batch_first: bool) -> Self {
        self.batch_first = batch_first;
        self
    }

    /// Set whether to return full sequences (default: true)
    pub fn with_return_sequences(mut self, return_sequences: bool) -> Self {
        self.return_sequences = return_sequences;
        self
    }

    /// Project every output to `proj_size` features
    pub fn with_proj_size(mut self, proj_size: usize, device: &B::Device) -> Self {
        self.proj = Some(LinearConfig::new(self.hidden_size, proj_size).init(device));
        self.output_size = proj_size;
        self
    }

    pub fn cell(&self) -> &CfCCell<B> {
        &self.cell
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Get output size (considering projection)
    pub fn output_size(&self) -> usize {
        self.output_size
    }

    /// Forward pass through the CfC RNN layer
    ///
    /// # Arguments
    /// * `input` - `[batch, seq, features]`, or `[seq, batch, features]` when not batch-first
    /// * `state` - Optional initial hidden state `[batch, hidden_size]`
    /// * `timespans` - Optional elapsed time per step `[batch, seq]`; ones when omitted
    ///
    /// # Returns
    /// `(output, final_state)` with output `[batch, seq, output_size]`, or
    /// `[batch, 1, output_size]` when only the last step is returned
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

impl<B: Backend> SequenceModel<B> for CfC<B> {
    fn forward_sequence(
        &self,
        input: Tensor<B, 3>,
        time_deltas: Option<Tensor<B, 2>>,
    ) -> Tensor<B, 3> {
        self.forward(input, None, time_deltas).0
    }
}
