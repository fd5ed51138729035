//! Training infrastructure: the epoch loop, gradient clipping and callbacks.

pub mod callbacks;
pub mod clipping;
pub mod trainer;

pub use callbacks::{CallbackAction, DivergenceCheck, EarlyStopping};
pub use clipping::{clip_gradients, global_grad_norm};
pub use trainer::{evaluate, StopReason, Trainer, TrainingReport};
