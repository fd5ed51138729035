//! # ncps - continuous-time recurrent cells on Burn
//!
//! Recurrent cells whose hidden state evolves in continuous time, sequence
//! layers around them, and a small training harness to compare them on
//! synthetic, irregularly sampled sequences.
//!
//! ## Features
//!
//! - **CfC**: Closed-form Continuous-time cells (3 modes: default, pure, no_gate)
//! - **CTRNN**: Euler-integrated continuous-time RNN with optional state clipping
//! - **CTGRU**: GRU with a bank of traces decaying at log-spaced time constants
//! - **ELTC**: Liquid time-constant neurons over a wiring, with Euler, semi-implicit or RK4 solvers
//! - **Wiring**: Fully connected synapse graphs with seeded polarities
//! - **Training**: Adam with global-norm clipping, early stopping and divergence detection
//!
//! ## Quick Start
//!
//! ```rust
//! use ncps::prelude::*;
//!
//! let mut wiring = FullyConnected::new(8, Some(1), 42, true);
//! wiring.build(2).unwrap();
//!
//! assert_eq!(wiring.units(), 8);
//! assert_eq!(wiring.output_dim(), Some(1));
//! assert_eq!(wiring.sensory_synapse_count(), 16);
//! ```
//!
//! ## Training a layer
//!
//! ```ignore
//! use burn::backend::{Autodiff, NdArray};
//! use ncps::prelude::*;
//!
//! type Backend = Autodiff<NdArray<f32>>;
//! let device = Default::default();
//!
//! let batch = ncps::data::sine_cosine_task::<Backend>(1000, &mut rng, &device);
//! let model = Ctrnn::<Backend>::new(2, 8, &device).with_proj_size(1, &device);
//! let (model, report) = Trainer::new(TrainingConfig::default()).fit("CTRNN", model, &batch);
//! ```

pub mod activation;
pub mod cells;
pub mod config;
pub mod data;
pub mod error;
pub mod experiments;
pub mod models;
pub mod rnn;
pub mod training;
pub mod wirings;

pub use error::{NcpsError, Result};

pub mod prelude {
    pub use crate::activation::{Activation, LeCun};
    pub use crate::cells::{
        CfCCell, CfcMode, CtgruCell, CtrnnCell, EltcCell, MappingMode, OdeSolver, RecurrentCell,
    };
    pub use crate::config::{AppConfig, CompareConfig, LiquidConfig, TrainingConfig};
    pub use crate::data::SequenceBatch;
    pub use crate::error::{NcpsError, Result};
    pub use crate::models::LiquidRegressor;
    pub use crate::rnn::{CfC, Ctgru, Ctrnn, Eltc, SequenceModel};
    pub use crate::training::{StopReason, Trainer, TrainingReport};
    pub use crate::wirings::{FullyConnected, Wiring};
}
