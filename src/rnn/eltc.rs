//! Enhanced Liquid Time-Constant (ELTC) RNN Layer
//!
//! Full RNN layer that handles sequence processing, batching, and state management
//! for ELTC cells.

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::{unroll, SequenceModel};
use crate::cells::{EltcCell, OdeSolver};
use crate::error::Result;
use crate::wirings::Wiring;

/// ELTC RNN Layer
///
/// The per-step output is the motor slice of the state after the output
/// mapping; the carried state covers every neuron of the wiring.
#[derive(Module, Debug)]
pub struct Eltc<B: Backend> {
    cell: EltcCell<B>,
    proj: Option<Linear<B>>,
    input_size: usize,
    batch_first: bool,
    return_sequences: bool,
    output_size: usize,
}

impl<B: Backend> Eltc<B> {
    /// Create a new ELTC RNN layer with the given wiring
    ///
    /// # Arguments
    /// * `input_size` - Number of input features
    /// * `wiring` - Wiring configuration defining the network structure
    /// * `device` - Device to create the module on
    pub fn new(input_size: usize, wiring: &dyn Wiring, device: &B::Device) -> Result<Self> {
        let cell = EltcCell::new(wiring, Some(input_size), device)?;
        Ok(Self::from_cell(input_size, cell))
    }

    /// Fully connected wiring of `hidden_size` units, every unit a motor neuron.
    pub fn fully_connected(
        input_size: usize,
        hidden_size: usize,
        seed: u64,
        device: &B::Device,
    ) -> Result<Self> {
        let cell = EltcCell::fully_connected(input_size, hidden_size, None, seed, device)?;
        Ok(Self::from_cell(input_size, cell))
    }

    fn from_cell(input_size: usize, cell: EltcCell<B>) -> Self {
        let output_size = cell.motor_size();
        Self {
            cell,
            proj: None,
            input_size,
            batch_first: true,
            return_sequences: true,
            output_size,
        }
    }

    pub fn with_solver(mut self, solver: OdeSolver) -> Self {
        self.cell = self.cell.with_solver(solver);
        self
    }

    pub fn with_ode_unfolds(mut self, unfolds: usize) -> Self {
        self.cell = self.cell.with_ode_unfolds(unfolds);
        self
    }

    /// Set whether input is batch-first (default: true)
    ///
    /// When true: input shape is [batch, seq, features]
    /// When false: input shape is [seq, batch, features]
    pub fn with_batch_first(mut self, batch_first: bool) -> Self {
        self.batch_first = batch_first;
        self
    }

    /// Set whether to return full sequences (default: true)
    pub fn with_return_sequences(mut self, return_sequences: bool) -> Self {
        self.return_sequences = return_sequences;
        self
    }

    pub fn with_proj_size(mut self, proj_size: usize, device: &B::Device) -> Self {
        self.proj = Some(LinearConfig::new(self.cell.motor_size(), proj_size).init(device));
        self.output_size = proj_size;
        self
    }

    pub fn cell(&self) -> &EltcCell<B> {
        &self.cell
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn state_size(&self) -> usize {
        self.cell.state_size()
    }

    pub fn motor_size(&self) -> usize {
        self.cell.motor_size()
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    /// Forward pass through the ELTC RNN layer
    ///
    /// # Arguments
    /// * `input` - `[batch, seq, features]`, or `[seq, batch, features]` when not batch-first
    /// * `state` - Optional initial state `[batch, state_size]`
    /// * `timespans` - Optional elapsed time per step `[batch, seq]`
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

impl<B: Backend> SequenceModel<B> for Eltc<B> {
    fn forward_sequence(
        &self,
        input: Tensor<B, 3>,
        time_deltas: Option<Tensor<B, 2>>,
    ) -> Tensor<B, 3> {
        self.forward(input, None, time_deltas).0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wirings::FullyConnected;
    use burn::backend::NdArray;

    type Backend = NdArray<f32>;

    #[test]
    fn test_motor_outputs_from_wiring() {
        let device = Default::default();
        let wiring = FullyConnected::new(10, Some(3), 5, true);
        let layer = Eltc::<Backend>::new(4, &wiring, &device).unwrap();

        let (output, state) = layer.forward(Tensor::zeros([2, 6, 4], &device), None, None);
        assert_eq!(output.dims(), [2, 6, 3]);
        assert_eq!(state.dims(), [2, 10]);
        assert_eq!(layer.motor_size(), 3);
    }

    #[test]
    fn test_fully_connected_with_projection() {
        let device = Default::default();
        let layer = Eltc::<Backend>::fully_connected(2, 8, 42, &device)
            .unwrap()
            .with_solver(OdeSolver::RungeKutta)
            .with_ode_unfolds(6)
            .with_proj_size(1, &device);

        let (output, _) = layer.forward(Tensor::zeros([1, 5, 2], &device), None, None);
        assert_eq!(output.dims(), [1, 5, 1]);
        assert_eq!(layer.cell().solver(), OdeSolver::RungeKutta);
    }
}
