//! # Continuous-time RNN Cells
//!
//! Single-timestep cells. Each one advances its hidden state by an elapsed
//! time that may differ per sample, and is wrapped by the sequence layers in
//! [`crate::rnn`].
//!
//! | Cell | Dynamics | State size |
//! |------|----------|------------|
//! | [`CfCCell`] | Closed-form solution, no solver | `hidden_size` |
//! | [`CtrnnCell`] | Explicit Euler on `dh/dt = -h/τ + f(x, h)` | `units` |
//! | [`CtgruCell`] | GRU with a bank of fixed time constants | `units × M` |
//! | [`EltcCell`] | Conductance-based LTC with a choice of ODE solver | `wiring.units()` |
//!
//! ## CfC Operating Modes
//!
//! ### Default
//! ```text
//! h = tanh(ff1) × (1 - σ(t)) + tanh(ff2) × σ(t)
//! ```
//!
//! ### Pure
//! ```text
//! h = a - a × exp(-t × (|w_τ| + |ff1|)) × ff1
//! ```
//!
//! ### NoGate
//! ```text
//! h = tanh(ff1) + tanh(ff2) × σ(t)
//! ```
//!
//! ## Tensor Shapes
//!
//! | Tensor | Shape |
//! |--------|-------|
//! | `input` | `[batch, input_size]` |
//! | `state` | `[batch, state_size]` |
//! | `elapsed` | `[batch]` |
//! | `output` | `[batch, output_size]` |
//!
//! ## Example: stepping a cell directly
//!
//! ```rust
//! use burn::backend::NdArray;
//! use burn::tensor::Tensor;
//! use ncps::cells::{CtrnnCell, RecurrentCell};
//!
//! type Backend = NdArray<f32>;
//! let device = Default::default();
//!
//! let cell = CtrnnCell::<Backend>::new(2, 8, &device).with_cell_clip(Some(1.0));
//! let input = Tensor::<Backend, 2>::zeros([4, 2], &device);
//! let state = Tensor::<Backend, 2>::zeros([4, cell.state_size()], &device);
//! let elapsed = Tensor::<Backend, 1>::ones([4], &device);
//!
//! let (output, new_state) = cell.step(input, state, elapsed);
//! assert_eq!(output.dims(), [4, 8]);
//! assert_eq!(new_state.dims(), [4, 8]);
//! ```

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

pub mod cfc_cell;
pub mod ctgru_cell;
pub mod ctrnn_cell;
pub mod eltc_cell;

pub use cfc_cell::{CfCCell, CfcMode};
pub use ctgru_cell::CtgruCell;
pub use ctrnn_cell::CtrnnCell;
pub use eltc_cell::{EltcCell, MappingMode, OdeSolver};

/// A cell that advances a hidden state by one (possibly irregular) timestep.
pub trait RecurrentCell<B: Backend> {
    /// Width of the input features
    fn input_size(&self) -> usize;

    /// Width of the hidden state carried between steps
    fn state_size(&self) -> usize;

    /// Width of the per-step output
    fn output_size(&self) -> usize;

    /// Advance one step. `elapsed` holds one time delta per batch entry.
    fn step(
        &self,
        input: Tensor<B, 2>,
        state: Tensor<B, 2>,
        elapsed: Tensor<B, 1>,
    ) -> (Tensor<B, 2>, Tensor<B, 2>);
}

/// `[batch]` time deltas broadcast to `[batch, width]`.
pub(crate) fn broadcast_time<B: Backend>(elapsed: Tensor<B, 1>, width: usize) -> Tensor<B, 2> {
    let [batch] = elapsed.dims();
    elapsed.unsqueeze_dim::<2>(1).expand([batch, width])
}
