//! CT-GRU sequence layer.

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::{unroll, SequenceModel};
use crate::cells::{CtgruCell, RecurrentCell};

/// The carried state is the flattened trace bank, `[batch, units * M]`.
#[derive(Module, Debug)]
pub struct Ctgru<B: Backend> {
    cell: CtgruCell<B>,
    proj: Option<Linear<B>>,
    batch_first: bool,
    return_sequences: bool,
    output_size: usize,
}

impl<B: Backend> Ctgru<B> {
    pub fn new(input_size: usize, units: usize, device: &B::Device) -> Self {
        Self::with_slots(input_size, units, 8, device)
    }

    pub fn with_slots(
        input_size: usize,
        units: usize,
        memory_slots: usize,
        device: &B::Device,
    ) -> Self {
        Self {
            cell: CtgruCell::with_slots(input_size, units, memory_slots, device),
            proj: None,
            batch_first: true,
            return_sequences: true,
            output_size: units,
        }
    }

    pub fn with_cell_clip(mut self, clip: Option<f64>) -> Self {
        self.cell = self.cell.with_cell_clip(clip);
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

    pub fn cell(&self) -> &CtgruCell<B> {
        &self.cell
    }

    pub fn state_size(&self) -> usize {
        self.cell.state_size()
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

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

impl<B: Backend> SequenceModel<B> for Ctgru<B> {
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
    use burn::backend::NdArray;

    type Backend = NdArray<f32>;

    #[test]
    fn test_projected_sequence_shapes() {
        let device = Default::default();
        let layer = Ctgru::<Backend>::new(2, 8, &device)
            .with_cell_clip(Some(1.0))
            .with_proj_size(1, &device);

        let (output, state) = layer.forward(Tensor::zeros([1, 12, 2], &device), None, None);
        assert_eq!(output.dims(), [1, 12, 1]);
        assert_eq!(state.dims(), [1, 64]);
        assert_eq!(layer.state_size(), 64);
    }
}
