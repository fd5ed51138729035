//! Tests for the wirings module

use ncps::wirings::*;
use ncps::NcpsError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fully_connected_creation() {
        let fc = FullyConnected::new(10, None, 1234, true);
        assert_eq!(fc.units(), 10);
        assert_eq!(fc.output_dim(), Some(10));
        assert!(!fc.is_built());
    }

    #[test]
    fn test_fully_connected_build() {
        let mut fc = FullyConnected::new(10, Some(5), 1234, true);
        fc.build(20).unwrap();
        assert!(fc.is_built());
        assert_eq!(fc.input_dim(), Some(20));

        let sensory = fc.sensory_adjacency_matrix().unwrap();
        assert_eq!(sensory.shape(), &[20, 10]);
        assert!(sensory.iter().all(|&p| p == 1 || p == -1));

        assert_eq!(fc.synapse_count(), 100);
        assert_eq!(fc.sensory_synapse_count(), 200);
    }

    #[test]
    fn test_without_self_connections() {
        let fc = FullyConnected::new(6, None, 7, false);
        let adj = fc.adjacency_matrix();
        for i in 0..6 {
            assert_eq!(adj[[i, i]], 0);
        }
        assert_eq!(fc.synapse_count(), 30);
    }

    #[test]
    fn test_same_seed_same_polarities() {
        let mut a = FullyConnected::new(8, Some(1), 42, true);
        let mut b = FullyConnected::new(8, Some(1), 42, true);
        a.build(2).unwrap();
        b.build(2).unwrap();
        assert_eq!(a.adjacency_matrix(), b.adjacency_matrix());
        assert_eq!(a.sensory_adjacency_matrix(), b.sensory_adjacency_matrix());

        let c = FullyConnected::new(8, Some(1), 43, true);
        assert_ne!(a.adjacency_matrix(), c.adjacency_matrix());
    }

    #[test]
    fn test_polarity_mix() {
        let fc = FullyConnected::new(40, None, 5, true);
        let inhibitory = fc.adjacency_matrix().iter().filter(|&&p| p == -1).count();
        let fraction = inhibitory as f64 / 1600.0;
        // Inhibitory with probability 1/3.
        assert!((0.25..0.42).contains(&fraction), "inhibitory fraction {fraction}");
    }

    #[test]
    fn test_fully_connected_serialization() {
        let mut fc = FullyConnected::new(10, Some(5), 1234, true);
        fc.build(20).unwrap();

        let config = fc.get_config();
        let fc2 = FullyConnected::from_config(config.clone()).unwrap();

        assert_eq!(fc.units(), fc2.units());
        assert_eq!(fc.input_dim(), fc2.input_dim());
        assert_eq!(fc.output_dim(), fc2.output_dim());
        assert_eq!(fc.adjacency_matrix(), fc2.adjacency_matrix());
        assert_eq!(fc2.get_config(), config);
    }

    #[test]
    fn test_conflicting_input_dim() {
        let mut fc = FullyConnected::new(10, None, 1234, true);
        fc.build(20).unwrap();
        assert!(fc.build(20).is_ok());
        assert!(fc.build(30).is_err());
    }

    #[test]
    fn test_neuron_types() {
        let fc = FullyConnected::new(4, Some(2), 1, true);
        assert_eq!(fc.neuron_type(0), "motor");
        assert_eq!(fc.neuron_type(1), "motor");
        assert_eq!(fc.neuron_type(2), "inter");
    }

    #[test]
    fn test_add_synapse() {
        let mut fc = FullyConnected::new(5, None, 1, false);
        fc.add_synapse(0, 0, -1).unwrap();
        assert_eq!(fc.adjacency_matrix()[[0, 0]], -1);
    }

    #[test]
    fn test_add_synapse_invalid_polarity() {
        let mut fc = FullyConnected::new(5, None, 1, true);
        assert!(fc.add_synapse(0, 1, 2).is_err());
    }

    #[test]
    fn test_add_synapse_out_of_bounds() {
        let mut fc = FullyConnected::new(5, None, 1, true);
        assert!(fc.add_synapse(5, 0, 1).is_err());
    }

    #[test]
    fn test_sensory_synapse_requires_build() {
        let mut fc = FullyConnected::new(5, None, 1, true);
        assert!(fc.add_sensory_synapse(0, 0, 1).is_err());
        fc.build(3).unwrap();
        fc.add_sensory_synapse(2, 4, -1).unwrap();
        assert_eq!(fc.sensory_adjacency_matrix().unwrap()[[2, 4]], -1);
        assert!(fc.add_sensory_synapse(3, 0, 1).is_err());
    }

    fn base_config(units: usize) -> WiringConfig {
        WiringConfig {
            units,
            adjacency_matrix: None,
            sensory_adjacency_matrix: None,
            input_dim: None,
            output_dim: None,
            erev_init_seed: Some(1),
            self_connections: Some(true),
        }
    }

    fn assert_wiring_error(config: WiringConfig) {
        match FullyConnected::from_config(config) {
            Err(NcpsError::Wiring(_)) => {}
            other => panic!("expected a wiring error, got {other:?}"),
        }
    }

    #[test]
    fn test_from_config_rejects_output_dim_above_units() {
        assert_wiring_error(WiringConfig {
            output_dim: Some(10),
            ..base_config(4)
        });
    }

    #[test]
    fn test_from_config_rejects_ragged_rows() {
        // 3 + 1 entries would still fill a 2x2 matrix.
        assert_wiring_error(WiringConfig {
            adjacency_matrix: Some(vec![vec![1, 1, 1], vec![1]]),
            ..base_config(2)
        });
    }

    #[test]
    fn test_from_config_rejects_bad_polarity() {
        assert_wiring_error(WiringConfig {
            adjacency_matrix: Some(vec![vec![5, 1], vec![1, 1]]),
            ..base_config(2)
        });
        assert_wiring_error(WiringConfig {
            input_dim: Some(1),
            sensory_adjacency_matrix: Some(vec![vec![1, -2]]),
            ..base_config(2)
        });
    }

    #[test]
    fn test_from_config_input_dim_and_sensory_matrix_go_together() {
        assert_wiring_error(WiringConfig {
            input_dim: Some(3),
            ..base_config(2)
        });
        assert_wiring_error(WiringConfig {
            sensory_adjacency_matrix: Some(vec![vec![1, 1]]),
            ..base_config(2)
        });
    }

    #[test]
    fn test_from_config_accepts_zero_entries() {
        let fc = FullyConnected::from_config(WiringConfig {
            adjacency_matrix: Some(vec![vec![0, -1], vec![1, 0]]),
            input_dim: Some(1),
            sensory_adjacency_matrix: Some(vec![vec![1, 0]]),
            output_dim: Some(2),
            ..base_config(2)
        })
        .unwrap();
        assert!(fc.is_built());
        assert_eq!(fc.synapse_count(), 2);
        assert_eq!(fc.sensory_synapse_count(), 1);
    }
}
