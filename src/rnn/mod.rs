//! # RNN Layers for Sequence Processing
//!
//! Each layer wraps one cell from [`crate::cells`] and handles the time loop,
//! batching, hidden state and per-step time deltas.
//!
//! ## Available Layers
//!
//! | Layer | Cell | Output size |
//! |-------|------|-------------|
//! | [`CfC`] | [`CfCCell`](crate::cells::CfCCell) | `hidden_size` |
//! | [`Ctrnn`] | [`CtrnnCell`](crate::cells::CtrnnCell) | `units` |
//! | [`Ctgru`] | [`CtgruCell`](crate::cells::CtgruCell) | `units` |
//! | [`Eltc`] | [`EltcCell`](crate::cells::EltcCell) | motor neurons of the wiring |
//!
//! Every layer accepts `.with_proj_size(n, &device)` to add a dense readout.
//!
//! ## Tensor Shapes
//!
//! | Tensor | Shape |
//! |--------|-------|
//! | input, batch-first (default) | `[batch, seq_len, features]` |
//! | input, sequence-first | `[seq_len, batch, features]` |
//! | time deltas | `[batch, seq_len]`, ones when omitted |
//! | output, `return_sequences=true` (default) | `[batch, seq_len, output_size]` |
//! | output, `return_sequences=false` | `[batch, 1, output_size]` |
//! | state | `[batch, state_size]` |
//!
//! ## Irregularly sampled sequences
//!
//! ```rust
//! use burn::backend::NdArray;
//! use burn::tensor::{Distribution, Tensor};
//! use ncps::rnn::Ctrnn;
//!
//! type Backend = NdArray<f32>;
//! let device = Default::default();
//!
//! let layer = Ctrnn::<Backend>::new(2, 8, &device).with_proj_size(1, &device);
//! let input = Tensor::<Backend, 3>::zeros([1, 50, 2], &device);
//! let deltas = Tensor::<Backend, 2>::random([1, 50], Distribution::Uniform(0.9, 1.1), &device);
//!
//! let (output, state) = layer.forward(input, None, Some(deltas));
//! assert_eq!(output.dims(), [1, 50, 1]);
//! assert_eq!(state.dims(), [1, 8]);
//! ```
//!
//! ## Stateful Processing
//!
//! ```ignore
//! let (out1, state) = layer.forward(batch1, None, None);
//! let (out2, state) = layer.forward(batch2, Some(state), None);
//! ```

use burn::nn::Linear;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::cells::RecurrentCell;

pub mod cfc;
pub mod ctgru;
pub mod ctrnn;
pub mod eltc;

pub use cfc::CfC;
pub use ctgru::Ctgru;
pub use ctrnn::Ctrnn;
pub use eltc::Eltc;

/// A model mapping a whole input sequence to an output sequence.
///
/// Implemented by every layer in this module so the trainer can fit any of them.
pub trait SequenceModel<B: Backend> {
    /// `input` follows the layer's layout; `time_deltas` is `[batch, seq_len]`.
    fn forward_sequence(
        &self,
        input: Tensor<B, 3>,
        time_deltas: Option<Tensor<B, 2>>,
    ) -> Tensor<B, 3>;
}

/// Runs `cell` over every timestep of `input`.
///
/// An empty sequence yields a `[batch, 0, out]` output and the state unchanged.
pub(crate) fn unroll<B: Backend, C: RecurrentCell<B>>(
    cell: &C,
    proj: Option<&Linear<B>>,
    input: Tensor<B, 3>,
    state: Option<Tensor<B, 2>>,
    timespans: Option<Tensor<B, 2>>,
    batch_first: bool,
    return_sequences: bool,
) -> (Tensor<B, 3>, Tensor<B, 2>) {
    let device = input.device();
    let [d0, d1, _] = input.dims();
    let (batch_size, seq_len) = if batch_first { (d0, d1) } else { (d1, d0) };
    let time_axis = if batch_first { 1 } else { 0 };

    let mut current_state =
        state.unwrap_or_else(|| Tensor::zeros([batch_size, cell.state_size()], &device));
    if seq_len == 0 {
        let out_size = proj.map_or(cell.output_size(), |p| p.weight.val().dims()[1]);
        return (
            Tensor::zeros([batch_size, 0, out_size], &device),
            current_state,
        );
    }

    let timespans = timespans.unwrap_or_else(|| Tensor::ones([batch_size, seq_len], &device));

    let mut outputs: Vec<Tensor<B, 2>> =
        Vec::with_capacity(if return_sequences { seq_len } else { 1 });

    for t in 0..seq_len {
        let step_input = input.clone().narrow(time_axis, t, 1).squeeze(time_axis);
        let step_time = timespans.clone().narrow(1, t, 1).squeeze(1);

        let (mut output, new_state) = cell.step(step_input, current_state, step_time);
        current_state = new_state;

        if let Some(proj) = proj {
            output = proj.forward(output);
        }

        if return_sequences || t + 1 == seq_len {
            outputs.push(output);
        }
    }

    let output = Tensor::stack(outputs, 1);
    (output, current_state)
}
