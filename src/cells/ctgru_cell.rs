//! Continuous-time GRU (CT-GRU) cell.
//!
//! Each unit keeps `M` memory traces decaying with fixed time constants
//! `τ_i = 10^(i/2)`. The cell predicts a log time scale for retrieval and
//! one for storage; the softmax of their squared distance to `ln τ_i`
//! spreads reads and writes over the traces. Traces decay by
//! `exp(-Δt / τ_i)` for the elapsed time of the step.

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::activation;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::RecurrentCell;

#[derive(Module, Debug)]
pub struct CtgruCell<B: Backend> {
    input_size: usize,
    units: usize,
    memory_slots: usize,
    /// Non-positive disables clipping
    cell_clip: f64,
    tau_r: Linear<B>,
    tau_s: Linear<B>,
    detect: Linear<B>,
}

impl<B: Backend> CtgruCell<B> {
    /// Eight memory slots, no clipping.
    pub fn new(input_size: usize, units: usize, device: &B::Device) -> Self {
        Self::with_slots(input_size, units, 8, device)
    }

    pub fn with_slots(
        input_size: usize,
        units: usize,
        memory_slots: usize,
        device: &B::Device,
    ) -> Self {
        let memory_slots = memory_slots.max(1);
        let fused = input_size + units;
        Self {
            input_size,
            units,
            memory_slots,
            cell_clip: 0.0,
            tau_r: LinearConfig::new(fused, units * memory_slots).init(device),
            tau_s: LinearConfig::new(fused, units * memory_slots).init(device),
            detect: LinearConfig::new(fused, units).init(device),
        }
    }

    pub fn with_cell_clip(mut self, clip: Option<f64>) -> Self {
        self.cell_clip = clip.filter(|c| *c > 0.0).unwrap_or(0.0);
        self
    }

    pub fn units(&self) -> usize {
        self.units
    }

    pub fn memory_slots(&self) -> usize {
        self.memory_slots
    }

    pub fn cell_clip(&self) -> Option<f64> {
        (self.cell_clip > 0.0).then_some(self.cell_clip)
    }

    /// `τ_i` for each memory slot, starting at 1 and growing by √10.
    pub fn time_constants(&self) -> Vec<f32> {
        (0..self.memory_slots)
            .map(|i| 10f32.powf(i as f32 * 0.5))
            .collect()
    }

    fn slot_table(&self, values: Vec<f32>, batch: usize, device: &B::Device) -> Tensor<B, 3> {
        Tensor::<B, 1>::from_floats(values.as_slice(), device)
            .reshape([1, 1, self.memory_slots])
            .expand([batch, self.units, self.memory_slots])
    }

    fn scales(&self, layer: &Linear<B>, fused: Tensor<B, 2>, ln_tau: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, _] = fused.dims();
        let predicted = layer
            .forward(fused)
            .reshape([batch, self.units, self.memory_slots]);
        let distance = (predicted - ln_tau).powf_scalar(2.0).neg();
        activation::softmax(distance, 2)
    }

    /// `state` is the flattened `[batch, units * M]` trace bank; the output is
    /// the per-unit sum over traces.
    pub fn forward(
        &self,
        input: Tensor<B, 2>,
        state: Tensor<B, 2>,
        elapsed: Tensor<B, 1>,
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let [batch, _] = input.dims();
        let device = input.device();
        let (units, slots) = (self.units, self.memory_slots);

        let taus = self.time_constants();
        let ln_tau = self.slot_table(taus.iter().map(|t| t.ln()).collect(), batch, &device);
        let inv_tau = self.slot_table(taus.iter().map(|t| t.recip()).collect(), batch, &device);

        let h_hat = state.reshape([batch, units, slots]);
        let h: Tensor<B, 2> = h_hat.clone().sum_dim(2).reshape([batch, units]);

        let fused = Tensor::cat(vec![input.clone(), h], 1);

        let retrieve = self.scales(&self.tau_r, fused.clone(), ln_tau.clone());
        let q: Tensor<B, 2> = (retrieve * h_hat.clone())
            .sum_dim(2)
            .reshape([batch, units]);

        let signal = self
            .detect
            .forward(Tensor::cat(vec![input, q], 1))
            .tanh()
            .reshape([batch, units, 1])
            .expand([batch, units, slots]);

        let store = self.scales(&self.tau_s, fused, ln_tau);

        let decay = elapsed
            .reshape([batch, 1, 1])
            .expand([batch, units, slots])
            .mul(inv_tau)
            .neg()
            .exp();

        let mut h_hat_next =
            ((store.clone().neg() + 1.0) * h_hat + store * signal) * decay;
        if let Some(clip) = self.cell_clip() {
            h_hat_next = h_hat_next.clamp(-clip, clip);
        }

        let output: Tensor<B, 2> = h_hat_next.clone().sum_dim(2).reshape([batch, units]);
        (output, h_hat_next.reshape([batch, units * slots]))
    }
}

impl<B: Backend> RecurrentCell<B> for CtgruCell<B> {
    fn input_size(&self) -> usize {
        self.input_size
    }

    fn state_size(&self) -> usize {
        self.units * self.memory_slots
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
