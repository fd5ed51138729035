//! Sequence-layer tests shared across every cell family

use burn::backend::NdArray;
use burn::tensor::{Distribution, Tensor};
use ncps::cells::CfcMode;
use ncps::rnn::{CfC, Ctgru, Ctrnn, Eltc, SequenceModel};

type Backend = NdArray<f32>;

fn random_input(dims: [usize; 3]) -> Tensor<Backend, 3> {
    Tensor::random(dims, Distribution::Uniform(-1.0, 1.0), &Default::default())
}

type Device = <Backend as burn::tensor::backend::Backend>::Device;

fn boxed<M: SequenceModel<Backend> + 'static>(model: M) -> Box<dyn SequenceModel<Backend>> {
    Box::new(model)
}

fn layers(device: &Device) -> Vec<(&'static str, Box<dyn SequenceModel<Backend>>)> {
    vec![
        ("cfc", boxed(CfC::new(3, 8, device).with_proj_size(2, device))),
        ("ctrnn", boxed(Ctrnn::new(3, 8, device).with_proj_size(2, device))),
        ("ctgru", boxed(Ctgru::new(3, 8, device).with_proj_size(2, device))),
        (
            "eltc",
            boxed(
                Eltc::fully_connected(3, 8, 42, device)
                    .unwrap()
                    .with_proj_size(2, device),
            ),
        ),
    ]
}

#[test]
fn test_every_layer_maps_sequences() {
    let device = Default::default();
    for (name, layer) in layers(&device) {
        let output = layer.forward_sequence(random_input([4, 9, 3]), None);
        assert_eq!(output.dims(), [4, 9, 2], "{name}");
    }
}

#[test]
fn test_every_layer_accepts_time_deltas() {
    let device = Default::default();
    let deltas = Tensor::<Backend, 2>::random([2, 6], Distribution::Uniform(0.9, 1.1), &device);

    for (name, layer) in layers(&device) {
        let output = layer.forward_sequence(random_input([2, 6, 3]), Some(deltas.clone()));
        let values = output.to_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| v.is_finite()), "{name}");
    }
}

#[test]
fn test_sequence_first_matches_batch_first() {
    let device = Default::default();
    let layer = CfC::<Backend>::new(3, 5, &device).with_mode(CfcMode::NoGate);
    let input = random_input([2, 7, 3]);

    let (batch_first, _) = layer.forward(input.clone(), None, None);

    let layer = layer.with_batch_first(false);
    let (seq_first, _) = layer.forward(input.swap_dims(0, 1), None, None);

    let diff = (batch_first - seq_first).abs().max().into_scalar();
    assert!(diff < 1e-6);
}

#[test]
fn test_split_sequence_matches_whole() {
    let device = Default::default();
    let layer = Ctrnn::<Backend>::new(3, 5, &device);
    let input = random_input([1, 10, 3]);

    let (_, whole_state) = layer.forward(input.clone(), None, None);
    let (_, mid) = layer.forward(input.clone().narrow(1, 0, 4), None, None);
    let (_, split_state) = layer.forward(input.narrow(1, 4, 6), Some(mid), None);

    let diff = (whole_state - split_state).abs().max().into_scalar();
    assert!(diff < 1e-5);
}

#[test]
fn test_last_step_only() {
    let device = Default::default();
    let layer = Ctgru::<Backend>::new(3, 4, &device).with_return_sequences(false);
    let (output, state) = layer.forward(random_input([3, 5, 3]), None, None);
    assert_eq!(output.dims(), [3, 1, 4]);
    assert_eq!(state.dims(), [3, 32]);
}

#[test]
fn test_empty_sequence() {
    let device = Default::default();
    for (name, layer) in layers(&device) {
        let output = layer.forward_sequence(Tensor::zeros([2, 0, 3], &device), None);
        assert_eq!(output.dims(), [2, 0, 2], "{name}");
    }

    let layer = Ctrnn::<Backend>::new(2, 4, &device);
    let state = Tensor::<Backend, 2>::full([1, 4], 0.5, &device);
    let (output, new_state) =
        layer.forward(Tensor::zeros([1, 0, 2], &device), Some(state.clone()), None);
    assert_eq!(output.dims(), [1, 0, 4]);
    new_state.to_data().assert_eq(&state.to_data(), true);
}
