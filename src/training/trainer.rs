//! Full-batch training loop.

use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::ElementConversion;
use serde::Serialize;

use super::callbacks::{CallbackAction, DivergenceCheck, EarlyStopping};
use super::clipping::clip_gradients;
use crate::config::TrainingConfig;
use crate::data::SequenceBatch;
use crate::models::mse;
use crate::rnn::SequenceModel;

/// Why a training run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Ran all configured epochs.
    Completed,
    /// The loss stopped improving for `patience` epochs.
    EarlyStopped,
    /// The loss became NaN or infinite; the model holds the last finite parameters.
    Diverged,
}

/// Outcome of one [`Trainer::fit`] call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub name: String,
    /// Epochs whose update was applied.
    pub epochs_run: usize,
    pub loss_history: Vec<f64>,
    pub best_loss: Option<f64>,
    /// `(epoch, loss)` pairs from the periodic evaluations, 1-based epochs.
    pub eval_losses: Vec<(usize, f64)>,
    pub stop_reason: StopReason,
    /// 0-based epoch at which training stopped early or diverged.
    pub stopped_at: Option<usize>,
}

impl TrainingReport {
    pub fn final_loss(&self) -> Option<f64> {
        self.loss_history.last().copied()
    }
}

/// Adam with global-norm clipping, early stopping and a divergence check.
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Trains `model` on the whole `batch` once per epoch.
    pub fn fit<B, M>(
        &self,
        name: &str,
        mut model: M,
        batch: &SequenceBatch<B>,
    ) -> (M, TrainingReport)
    where
        B: AutodiffBackend,
        M: AutodiffModule<B> + SequenceModel<B>,
        M::InnerModule: SequenceModel<B::InnerBackend>,
    {
        let config = &self.config;
        let mut optim = AdamConfig::new()
            .with_beta_1(config.beta_1)
            .with_beta_2(config.beta_2)
            .with_epsilon(config.epsilon)
            .init::<B, M>();

        let mut early_stopping = EarlyStopping::new(config.patience, config.min_delta);
        let mut divergence = DivergenceCheck;
        let eval_batch = (config.eval_every > 0).then(|| batch.inner());

        let mut report = TrainingReport {
            name: name.to_string(),
            epochs_run: 0,
            loss_history: Vec::with_capacity(config.num_epochs),
            best_loss: None,
            eval_losses: Vec::new(),
            stop_reason: StopReason::Completed,
            stopped_at: None,
        };

        tracing::info!(model = name, epochs = config.num_epochs, "Training {name}");

        for epoch in 0..config.num_epochs {
            let pred = model.forward_sequence(batch.inputs.clone(), batch.time_deltas.clone());
            let loss = mse(pred, batch.targets.clone());
            let value = loss.clone().into_scalar().elem::<f64>();

            if divergence.on_epoch_end(epoch, value) == CallbackAction::Stop {
                tracing::warn!(
                    model = name,
                    epoch,
                    "Training {name} failed at epoch {epoch} with NaN loss."
                );
                report.stop_reason = StopReason::Diverged;
                report.stopped_at = Some(epoch);
                break;
            }

            let mut grads = GradientsParams::from_grads(loss.backward(), &model);
            let grad_norm = clip_gradients::<B, M>(
                &model,
                &mut grads,
                config.max_grad_norm,
                config.max_grad_value,
            );
            tracing::debug!(model = name, epoch, loss = value, grad_norm, "step");

            model = optim.step(config.learning_rate, model, grads);
            report.loss_history.push(value);
            report.epochs_run += 1;

            if early_stopping.on_epoch_end(epoch, value) == CallbackAction::Stop {
                tracing::info!(model = name, epoch, "Early stopping triggered at epoch {epoch}");
                report.stop_reason = StopReason::EarlyStopped;
                report.stopped_at = Some(epoch);
                break;
            }

            if config.log_every > 0 && (epoch + 1) % config.log_every == 0 {
                tracing::info!(
                    model = name,
                    epoch = epoch + 1,
                    loss = value,
                    "Epoch {}, Loss: {:.6}",
                    epoch + 1,
                    value
                );
            }

            if let Some(eval_batch) = &eval_batch {
                if (epoch + 1) % config.eval_every == 0 {
                    let eval_loss = evaluate(&model.valid(), eval_batch);
                    tracing::info!(
                        model = name,
                        epoch = epoch + 1,
                        eval_loss,
                        "Evaluation Loss: {eval_loss:.6}"
                    );
                    report.eval_losses.push((epoch + 1, eval_loss));
                }
            }
        }

        report.best_loss = early_stopping.best_loss();
        (model, report)
    }
}

/// Mean squared error of `model` on `batch`.
pub fn evaluate<B, M>(model: &M, batch: &SequenceBatch<B>) -> f64
where
    B: Backend,
    M: SequenceModel<B>,
{
    let pred = model.forward_sequence(batch.inputs.clone(), batch.time_deltas.clone());
    mse(pred, batch.targets.clone()).into_scalar().elem::<f64>()
}
