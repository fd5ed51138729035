//! CfC regressor on the sequence-sum task.

use burn::module::AutodiffModule;
use burn::tensor::backend::AutodiffBackend;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::LiquidConfig;
use crate::data::{sum_task, SumTask};
use crate::error::Result;
use crate::models::LiquidRegressor;
use crate::rnn::SequenceModel;
use crate::training::{evaluate, Trainer, TrainingReport};

/// Shapes and error of one evaluated split.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitEval {
    /// Shape of the whole split's inputs.
    pub input_shape: [usize; 3],
    pub time_shape: [usize; 3],
    /// Predictions for the evaluated prefix, `[batch_size, output_dim]`.
    pub output_shape: [usize; 2],
    pub mse: f64,
}

#[derive(Debug, Clone)]
pub struct LiquidReport {
    pub train: SplitEval,
    pub test: SplitEval,
    /// Present when `train_epochs > 0`.
    pub training: Option<TrainingReport>,
}

pub fn run<B: AutodiffBackend>(config: &LiquidConfig, device: &B::Device) -> Result<LiquidReport> {
    config.validate()?;
    B::seed(config.seed);
    let mut rng = StdRng::seed_from_u64(config.seed);

    let train = sum_task::<B>(
        config.train_samples,
        config.seq_len,
        config.input_dim,
        &mut rng,
        device,
    );
    let test = sum_task::<B>(
        config.test_samples,
        config.seq_len,
        config.input_dim,
        &mut rng,
        device,
    );

    let mut model = LiquidRegressor::<B>::new(
        config.input_dim,
        config.hidden_dim,
        config.output_dim,
        device,
    )
    .with_mode(config.mode)
    .with_backbone(
        config.backbone_units,
        config.backbone_layers,
        config.backbone_dropout,
    )
    .with_activation(config.activation);

    let training = if config.train_epochs > 0 {
        let trainer = Trainer::new(crate::config::TrainingConfig {
            num_epochs: config.train_epochs,
            ..config.training.clone()
        });
        let (trained, report) = trainer.fit("CfC", model, &train.to_batch());
        model = trained;
        Some(report)
    } else {
        None
    };

    let model = model.valid();
    let train_eval = evaluate_split(&model, &train, config.batch_size);
    tracing::info!(mse = train_eval.mse, "Training MSE: {:.4}", train_eval.mse);
    let test_eval = evaluate_split(&model, &test, config.batch_size);
    tracing::info!(mse = test_eval.mse, "Test MSE: {:.4}", test_eval.mse);

    Ok(LiquidReport {
        train: train_eval,
        test: test_eval,
        training,
    })
}

/// Evaluates the first `batch_size` samples of `split`.
fn evaluate_split<B, M>(model: &M, split: &SumTask<B>, batch_size: usize) -> SplitEval
where
    B: AutodiffBackend,
    M: SequenceModel<B::InnerBackend>,
{
    let batch = split.narrow(batch_size).to_batch().inner();
    let mse = evaluate(model, &batch);
    let [n, _, out] = batch.targets.dims();

    SplitEval {
        input_shape: split.inputs.dims(),
        time_shape: split.times.dims(),
        output_shape: [n, out],
        mse,
    }
}
