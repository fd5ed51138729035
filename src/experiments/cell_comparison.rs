//! Trains several continuous-time cells on the same irregularly sampled
//! sine/cosine sequence and compares their final errors.

use burn::module::AutodiffModule;
use burn::tensor::backend::AutodiffBackend;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::CellKind;
use crate::activation::Activation;
use crate::config::CompareConfig;
use crate::data::{sine_cosine_task, SequenceBatch};
use crate::error::Result;
use crate::rnn::{CfC, Ctgru, Ctrnn, Eltc, SequenceModel};
use crate::training::{evaluate, Trainer, TrainingReport};
use crate::wirings::{FullyConnected, Wiring};

/// Per-model training reports and the MSE of each trained model.
#[derive(Debug, Clone)]
pub struct ComparisonReport {
    pub reports: Vec<TrainingReport>,
    pub final_losses: Vec<(String, f64)>,
}

/// Runs the comparison for every cell kind in `config.cells`.
pub fn run<B: AutodiffBackend>(
    config: &CompareConfig,
    device: &B::Device,
) -> Result<ComparisonReport> {
    config.validate()?;
    B::seed(config.seed);
    let mut rng = StdRng::seed_from_u64(config.seed);

    let batch = sine_cosine_task::<B>(config.seq_len, &mut rng, device);
    let trainer = Trainer::new(config.training.clone());

    let mut reports = Vec::with_capacity(config.cells.len());
    let mut final_losses = Vec::with_capacity(config.cells.len());

    for &kind in &config.cells {
        let (report, final_loss) = match kind {
            CellKind::Ctrnn => {
                let model = Ctrnn::<B>::new(config.in_features, config.units, device)
                    .with_activation(Activation::Tanh)
                    .with_cell_clip(Some(config.cell_clip))
                    .with_proj_size(config.out_features, device);
                train_and_score(&trainer, kind, model, &batch)
            }
            CellKind::Ctgru => {
                let model = Ctgru::<B>::with_slots(
                    config.in_features,
                    config.units,
                    config.ctgru_memory_slots,
                    device,
                )
                .with_cell_clip(Some(config.cell_clip))
                .with_proj_size(config.out_features, device);
                train_and_score(&trainer, kind, model, &batch)
            }
            CellKind::Eltc => {
                let mut wiring =
                    FullyConnected::new(config.units, Some(config.out_features), config.seed, true);
                wiring.build(config.in_features)?;
                let model = Eltc::<B>::new(config.in_features, &wiring, device)?
                    .with_solver(config.solver)
                    .with_ode_unfolds(config.ode_unfolds);
                train_and_score(&trainer, kind, model, &batch)
            }
            CellKind::Cfc => {
                let model = CfC::<B>::new(config.in_features, config.units, device)
                    .with_proj_size(config.out_features, device);
                train_and_score(&trainer, kind, model, &batch)
            }
        };

        tracing::info!(model = kind.label(), final_loss, stop = ?report.stop_reason, "finished");
        final_losses.push((kind.label().to_string(), final_loss));
        reports.push(report);
    }

    Ok(ComparisonReport {
        reports,
        final_losses,
    })
}

fn train_and_score<B, M>(
    trainer: &Trainer,
    kind: CellKind,
    model: M,
    batch: &SequenceBatch<B>,
) -> (TrainingReport, f64)
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + SequenceModel<B>,
    M::InnerModule: SequenceModel<B::InnerBackend>,
{
    let (model, report) = trainer.fit(kind.label(), model, batch);
    let final_loss = evaluate(&model.valid(), &batch.inner());
    (report, final_loss)
}
