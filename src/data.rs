//! Synthetic sequence tasks.
//!
//! Both generators draw from a caller-owned [`StdRng`] so a fixed seed
//! reproduces the same tensors.

use std::f64::consts::PI;

use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{Tensor, TensorData};
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal, Uniform};

/// Inputs, targets and optional per-step time deltas of one training batch.
#[derive(Debug, Clone)]
pub struct SequenceBatch<B: Backend> {
    /// `[batch, seq_len, features]`
    pub inputs: Tensor<B, 3>,
    /// `[batch, seq_out, out_features]`
    pub targets: Tensor<B, 3>,
    /// `[batch, seq_len]`
    pub time_deltas: Option<Tensor<B, 2>>,
}

impl<B: Backend> SequenceBatch<B> {
    pub fn batch_size(&self) -> usize {
        self.inputs.dims()[0]
    }

    pub fn seq_len(&self) -> usize {
        self.inputs.dims()[1]
    }

    /// First `k` samples (all of them when `k` exceeds the batch).
    pub fn narrow(&self, k: usize) -> Self {
        let k = k.min(self.batch_size());
        Self {
            inputs: self.inputs.clone().narrow(0, 0, k),
            targets: self.targets.clone().narrow(0, 0, k),
            time_deltas: self.time_deltas.clone().map(|t| t.narrow(0, 0, k)),
        }
    }
}

impl<B: AutodiffBackend> SequenceBatch<B> {
    /// Same batch on the inner backend, for evaluation without a graph.
    pub fn inner(&self) -> SequenceBatch<B::InnerBackend> {
        SequenceBatch {
            inputs: self.inputs.clone().inner(),
            targets: self.targets.clone().inner(),
            time_deltas: self.time_deltas.clone().map(|t| t.inner()),
        }
    }
}

/// Raw tensors of the sequence-sum regression task.
#[derive(Debug, Clone)]
pub struct SumTask<B: Backend> {
    /// `[n, seq_len, input_dim]`, drawn from N(0, 1)
    pub inputs: Tensor<B, 3>,
    /// `[n, seq_len, 1]`, uniform in `[0.1, 1.0)`
    pub times: Tensor<B, 3>,
    /// `[n, input_dim]`, the inputs summed over the sequence axis
    pub targets: Tensor<B, 2>,
}

impl<B: Backend> SumTask<B> {
    pub fn num_samples(&self) -> usize {
        self.inputs.dims()[0]
    }

    pub fn narrow(&self, k: usize) -> Self {
        let k = k.min(self.num_samples());
        Self {
            inputs: self.inputs.clone().narrow(0, 0, k),
            times: self.times.clone().narrow(0, 0, k),
            targets: self.targets.clone().narrow(0, 0, k),
        }
    }

    /// Reshapes into the layout the trainer consumes: time deltas become
    /// `[n, seq_len]` and targets a single output step `[n, 1, input_dim]`.
    pub fn to_batch(&self) -> SequenceBatch<B> {
        let [n, seq_len, dim] = self.inputs.dims();
        SequenceBatch {
            inputs: self.inputs.clone(),
            targets: self.targets.clone().reshape([n, 1, dim]),
            time_deltas: Some(self.times.clone().reshape([n, seq_len])),
        }
    }
}

fn linspace(start: f64, end: f64, len: usize) -> impl Iterator<Item = f64> {
    let step = if len > 1 {
        (end - start) / (len - 1) as f64
    } else {
        0.0
    };
    (0..len).map(move |i| start + step * i as f64)
}

/// One long sequence: `(sin, cos)` of `linspace(0, 3π)` in, `sin(linspace(0, 6π))` out.
///
/// Time deltas are uniform in `[0.9, 1.1]`.
pub fn sine_cosine_task<B: Backend>(
    len: usize,
    rng: &mut StdRng,
    device: &B::Device,
) -> SequenceBatch<B> {
    let inputs: Vec<f32> = linspace(0.0, 3.0 * PI, len)
        .flat_map(|x| [x.sin() as f32, x.cos() as f32])
        .collect();
    let targets: Vec<f32> = linspace(0.0, 6.0 * PI, len)
        .map(|x| x.sin() as f32)
        .collect();

    let jitter = Uniform::new_inclusive(0.9f32, 1.1f32);
    let deltas: Vec<f32> = (0..len)
        .map(|_| jitter.sample(rng).clamp(0.9, 1.1))
        .collect();

    SequenceBatch {
        inputs: Tensor::from_data(TensorData::new(inputs, [1, len, 2]), device),
        targets: Tensor::from_data(TensorData::new(targets, [1, len, 1]), device),
        time_deltas: Some(Tensor::from_data(TensorData::new(deltas, [1, len]), device)),
    }
}

/// `num_samples` random sequences whose target is their sum over time.
pub fn sum_task<B: Backend>(
    num_samples: usize,
    seq_len: usize,
    input_dim: usize,
    rng: &mut StdRng,
    device: &B::Device,
) -> SumTask<B> {
    let uniform = Uniform::new(0.1f32, 1.0f32);

    let inputs: Vec<f32> = (0..num_samples * seq_len * input_dim)
        .map(|_| -> f32 { StandardNormal.sample(rng) })
        .collect();
    let times: Vec<f32> = (0..num_samples * seq_len)
        .map(|_| uniform.sample(rng))
        .collect();

    let mut targets = vec![0.0f32; num_samples * input_dim];
    for (i, value) in inputs.iter().enumerate() {
        let sample = i / (seq_len * input_dim);
        let feature = i % input_dim;
        targets[sample * input_dim + feature] += value;
    }

    SumTask {
        inputs: Tensor::from_data(
            TensorData::new(inputs, [num_samples, seq_len, input_dim]),
            device,
        ),
        times: Tensor::from_data(TensorData::new(times, [num_samples, seq_len, 1]), device),
        targets: Tensor::from_data(TensorData::new(targets, [num_samples, input_dim]), device),
    }
}
