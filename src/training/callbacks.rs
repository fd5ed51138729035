//! Epoch-end checks: early stopping and divergence detection.

use serde::{Deserialize, Serialize};

/// Action a callback can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Continue,
    Stop,
}

/// Early stopping on a training loss that stops improving.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarlyStopping {
    pub patience: usize,
    pub min_delta: f64,
    #[serde(skip)]
    counter: usize,
    #[serde(skip)]
    best_loss: Option<f64>,
}

impl EarlyStopping {
    pub fn new(patience: usize, min_delta: f64) -> Self {
        Self {
            patience,
            min_delta,
            counter: 0,
            best_loss: None,
        }
    }

    pub fn best_loss(&self) -> Option<f64> {
        self.best_loss
    }

    /// Epochs since the last improvement.
    pub fn counter(&self) -> usize {
        self.counter
    }

    pub fn on_epoch_end(&mut self, _epoch: usize, loss: f64) -> CallbackAction {
        match self.best_loss {
            None => {
                self.best_loss = Some(loss);
                CallbackAction::Continue
            }
            Some(best) if loss < best - self.min_delta => {
                self.best_loss = Some(loss);
                self.counter = 0;
                CallbackAction::Continue
            }
            Some(_) => {
                self.counter += 1;
                if self.counter >= self.patience {
                    CallbackAction::Stop
                } else {
                    CallbackAction::Continue
                }
            }
        }
    }
}

/// Stops on a NaN or infinite loss.
#[derive(Debug, Clone, Copy, Default)]
pub struct DivergenceCheck;

impl DivergenceCheck {
    pub fn on_epoch_end(&mut self, _epoch: usize, loss: f64) -> CallbackAction {
        if loss.is_finite() {
            CallbackAction::Continue
        } else {
            CallbackAction::Stop
        }
    }
}
