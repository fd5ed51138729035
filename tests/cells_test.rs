//! Behavioural tests for the continuous-time cells

use burn::backend::NdArray;
use burn::tensor::{Distribution, Tensor};
use ncps::activation::Activation;
use ncps::cells::{CtgruCell, CtrnnCell, EltcCell, OdeSolver, RecurrentCell};
use ncps::wirings::{FullyConnected, Wiring, WiringConfig};
use ncps::NcpsError;
use ndarray::Array2;

type Backend = NdArray<f32>;

fn elapsed(batch: usize, value: f32) -> Tensor<Backend, 1> {
    Tensor::full([batch], value, &Default::default())
}

#[test]
fn test_ctrnn_clip_bounds_state() {
    let device = Default::default();
    let cell = CtrnnCell::<Backend>::new(3, 5, &device)
        .with_activation(Activation::Tanh)
        .with_cell_clip(Some(0.2));

    let input = Tensor::<Backend, 2>::random([4, 3], Distribution::Uniform(-5.0, 5.0), &device);
    let state = Tensor::<Backend, 2>::full([4, 5], 3.0, &device);

    let (_, state) = cell.step(input, state, elapsed(4, 1.0));
    let max = state.abs().max().into_scalar();
    assert!(max <= 0.2 + 1e-6, "state escaped the clip: {max}");
}

#[test]
fn test_ctrnn_zero_elapsed_keeps_state() {
    let device = Default::default();
    let cell = CtrnnCell::<Backend>::new(3, 5, &device);

    let input = Tensor::<Backend, 2>::ones([2, 3], &device);
    let state = Tensor::<Backend, 2>::random([2, 5], Distribution::Uniform(-1.0, 1.0), &device);

    let (_, next) = cell.step(input, state.clone(), elapsed(2, 0.0));
    let diff = (next - state).abs().max().into_scalar();
    assert!(diff < 1e-6);
}

#[test]
fn test_ctgru_state_and_output_sizes() {
    let device = Default::default();
    let cell = CtgruCell::<Backend>::with_slots(2, 8, 4, &device);
    assert_eq!(cell.state_size(), 32);
    assert_eq!(cell.output_size(), 8);

    let (output, state) = cell.step(
        Tensor::zeros([3, 2], &device),
        Tensor::zeros([3, 32], &device),
        elapsed(3, 1.0),
    );
    assert_eq!(output.dims(), [3, 8]);
    assert_eq!(state.dims(), [3, 32]);
}

#[test]
fn test_ctgru_time_constants_are_log_spaced() {
    let device = Default::default();
    let cell = CtgruCell::<Backend>::new(2, 4, &device);
    let taus = cell.time_constants();

    assert_eq!(taus.len(), 8);
    assert!((taus[0] - 1.0).abs() < 1e-6);
    assert!((taus[2] - 10.0).abs() < 1e-4);
    for pair in taus.windows(2) {
        assert!((pair[1] / pair[0] - 10f32.sqrt()).abs() < 1e-3);
    }
}

#[test]
fn test_ctgru_long_gap_decays_memory() {
    let device = Default::default();
    let cell = CtgruCell::<Backend>::new(2, 4, &device);
    let input = Tensor::<Backend, 2>::zeros([1, 2], &device);
    let state = Tensor::<Backend, 2>::ones([1, 32], &device);

    let (_, short) = cell.step(input.clone(), state.clone(), elapsed(1, 0.1));
    let (_, long) = cell.step(input, state, elapsed(1, 1000.0));

    let short = short.abs().sum().into_scalar();
    let long = long.abs().sum().into_scalar();
    assert!(long < short, "expected decay: short={short}, long={long}");
}

#[test]
fn test_eltc_outputs_motor_neurons() {
    let device = Default::default();
    let mut wiring = FullyConnected::new(8, Some(2), 42, true);
    wiring.build(3).unwrap();

    let cell = EltcCell::<Backend>::new(&wiring, None, &device).unwrap();
    assert_eq!(cell.synapse_count(), wiring.synapse_count());
    assert_eq!(cell.sensory_synapse_count(), 24);

    let (output, state) = cell.step(
        Tensor::ones([5, 3], &device),
        Tensor::zeros([5, 8], &device),
        elapsed(5, 1.0),
    );
    assert_eq!(output.dims(), [5, 2]);
    assert_eq!(state.dims(), [5, 8]);
}

#[test]
fn test_eltc_every_solver_stays_finite() {
    let device = Default::default();
    for solver in [OdeSolver::SemiImplicit, OdeSolver::Explicit, OdeSolver::RungeKutta] {
        let cell = EltcCell::<Backend>::fully_connected(2, 6, None, 1, &device)
            .unwrap()
            .with_solver(solver);

        let mut state = Tensor::<Backend, 2>::zeros([1, 6], &device);
        for _ in 0..20 {
            let input = Tensor::<Backend, 2>::random([1, 2], Distribution::Uniform(-1.0, 1.0), &device);
            state = cell.step(input, state, elapsed(1, 1.0)).1;
        }

        let values = state.to_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| v.is_finite()), "{solver} diverged");
    }
}

#[test]
fn test_eltc_rejects_unbuilt_wiring() {
    let device = Default::default();
    let wiring = FullyConnected::new(4, None, 1, true);
    assert!(EltcCell::<Backend>::new(&wiring, None, &device).is_err());
}

/// Reports more motor neurons than it has units.
struct OversizedMotor {
    adjacency: Array2<i32>,
    sensory: Array2<i32>,
}

impl Wiring for OversizedMotor {
    fn units(&self) -> usize {
        2
    }

    fn input_dim(&self) -> Option<usize> {
        Some(1)
    }

    fn output_dim(&self) -> Option<usize> {
        Some(5)
    }

    fn build(&mut self, _input_dim: usize) -> ncps::Result<()> {
        Ok(())
    }

    fn adjacency_matrix(&self) -> &Array2<i32> {
        &self.adjacency
    }

    fn sensory_adjacency_matrix(&self) -> Option<&Array2<i32>> {
        Some(&self.sensory)
    }

    fn add_synapse(&mut self, _src: usize, _dest: usize, _polarity: i32) -> ncps::Result<()> {
        Ok(())
    }

    fn add_sensory_synapse(
        &mut self,
        _src: usize,
        _dest: usize,
        _polarity: i32,
    ) -> ncps::Result<()> {
        Ok(())
    }

    fn get_config(&self) -> WiringConfig {
        WiringConfig {
            units: 2,
            adjacency_matrix: None,
            sensory_adjacency_matrix: None,
            input_dim: Some(1),
            output_dim: Some(5),
            erev_init_seed: None,
            self_connections: None,
        }
    }
}

#[test]
fn test_eltc_rejects_more_motor_neurons_than_units() {
    let device = Default::default();
    let wiring = OversizedMotor {
        adjacency: Array2::ones((2, 2)),
        sensory: Array2::ones((1, 2)),
    };
    assert!(matches!(
        EltcCell::<Backend>::new(&wiring, None, &device),
        Err(NcpsError::Wiring(_))
    ));
}
