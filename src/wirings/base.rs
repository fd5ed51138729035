use ndarray::Array2;
use rand::prelude::*;

use super::WiringConfig;
use crate::error::{NcpsError, Result};

/// Connectivity between the units of a recurrent cell.
///
/// `adjacency_matrix[[src, dest]]` holds the polarity of the synapse from
/// `src` to `dest`: `1` excitatory, `-1` inhibitory, `0` absent. The sensory
/// matrix has one row per input feature and exists once the wiring is built.
pub trait Wiring: Send + Sync {
    /// Returns the number of neurons in this wiring
    fn units(&self) -> usize;

    /// Returns the input dimension (number of sensory features)
    fn input_dim(&self) -> Option<usize>;

    /// Returns the output dimension (number of motor neurons)
    fn output_dim(&self) -> Option<usize>;

    /// Check if the wiring has been built (input dimension is set)
    fn is_built(&self) -> bool {
        self.input_dim().is_some()
    }

    /// Build the wiring for the given input dimension.
    ///
    /// Building twice with the same dimension is a no-op.
    fn build(&mut self, input_dim: usize) -> Result<()>;

    /// Motor neurons come first, everything else is an inter neuron.
    fn neuron_type(&self, neuron_id: usize) -> &'static str {
        let output_dim = self.output_dim().unwrap_or(0);
        if neuron_id < output_dim {
            "motor"
        } else {
            "inter"
        }
    }

    fn adjacency_matrix(&self) -> &Array2<i32>;

    fn sensory_adjacency_matrix(&self) -> Option<&Array2<i32>>;

    /// Initial reversal potentials of the internal synapses
    fn erev_initializer(&self) -> Array2<i32> {
        self.adjacency_matrix().clone()
    }

    /// Initial reversal potentials of the sensory synapses
    fn sensory_erev_initializer(&self) -> Option<Array2<i32>> {
        self.sensory_adjacency_matrix().cloned()
    }

    fn add_synapse(&mut self, src: usize, dest: usize, polarity: i32) -> Result<()>;

    fn add_sensory_synapse(&mut self, src: usize, dest: usize, polarity: i32) -> Result<()>;

    fn synapse_count(&self) -> usize {
        self.adjacency_matrix().iter().map(|x| x.unsigned_abs() as usize).sum()
    }

    fn sensory_synapse_count(&self) -> usize {
        self.sensory_adjacency_matrix()
            .map(|m| m.iter().map(|x| x.unsigned_abs() as usize).sum())
            .unwrap_or(0)
    }

    /// Create a serialization config for this wiring
    fn get_config(&self) -> WiringConfig;
}

fn check_polarity(polarity: i32) -> Result<()> {
    if polarity == -1 || polarity == 1 {
        Ok(())
    } else {
        Err(NcpsError::wiring(format!(
            "polarity must be -1 or 1, got {polarity}"
        )))
    }
}

// One in three synapses is inhibitory.
fn random_polarity(rng: &mut StdRng) -> i32 {
    if rng.gen::<f64>() < 0.33 {
        -1
    } else {
        1
    }
}

/// Every unit connected to every other unit
#[derive(Clone, Debug)]
pub struct FullyConnected {
    units: usize,
    output_dim: usize,
    adjacency_matrix: Array2<i32>,
    sensory_adjacency_matrix: Option<Array2<i32>>,
    input_dim: Option<usize>,
    self_connections: bool,
    erev_init_seed: u64,
}

impl FullyConnected {
    /// `output_dim` defaults to `units`; polarities are drawn from `erev_init_seed`.
    pub fn new(
        units: usize,
        output_dim: Option<usize>,
        erev_init_seed: u64,
        self_connections: bool,
    ) -> Self {
        let output_dim = output_dim.unwrap_or(units).min(units);
        let mut adjacency_matrix = Array2::zeros((units, units));
        let mut rng = StdRng::seed_from_u64(erev_init_seed);

        for src in 0..units {
            for dest in 0..units {
                if src == dest && !self_connections {
                    continue;
                }
                adjacency_matrix[[src, dest]] = random_polarity(&mut rng);
            }
        }

        Self {
            units,
            output_dim,
            adjacency_matrix,
            sensory_adjacency_matrix: None,
            input_dim: None,
            self_connections,
            erev_init_seed,
        }
    }

    pub fn self_connections(&self) -> bool {
        self.self_connections
    }

    pub fn from_config(config: WiringConfig) -> Result<Self> {
        let units = config.units;
        let output_dim = config.output_dim.unwrap_or(units);
        if output_dim > units {
            return Err(NcpsError::wiring(format!(
                "output_dim {output_dim} exceeds units {units}"
            )));
        }

        let adjacency_matrix = match config.adjacency_matrix {
            Some(rows) => matrix_from_rows(rows, units, units)?,
            None => Array2::zeros((units, units)),
        };

        let sensory_adjacency_matrix = match (config.input_dim, config.sensory_adjacency_matrix) {
            (Some(input_dim), Some(rows)) => Some(matrix_from_rows(rows, input_dim, units)?),
            (None, None) => None,
            (Some(_), None) => {
                return Err(NcpsError::wiring(
                    "input_dim set but the sensory matrix is missing",
                ))
            }
            (None, Some(_)) => {
                return Err(NcpsError::wiring(
                    "input_dim required when a sensory matrix is present",
                ))
            }
        };

        Ok(Self {
            units,
            output_dim,
            adjacency_matrix,
            sensory_adjacency_matrix,
            input_dim: config.input_dim,
            self_connections: config.self_connections.unwrap_or(true),
            erev_init_seed: config.erev_init_seed.unwrap_or(1111),
        })
    }
}

/// Rows must be `ncols` wide and hold only `-1`, `0` or `1`.
fn matrix_from_rows(rows: Vec<Vec<i32>>, nrows: usize, ncols: usize) -> Result<Array2<i32>> {
    if rows.len() != nrows {
        return Err(NcpsError::wiring(format!(
            "expected {nrows} rows, got {}",
            rows.len()
        )));
    }
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != ncols) {
        return Err(NcpsError::wiring(format!(
            "row {i} has {} entries, expected {ncols}",
            row.len()
        )));
    }
    if let Some(&bad) = rows.iter().flatten().find(|&&v| !(-1..=1).contains(&v)) {
        return Err(NcpsError::wiring(format!(
            "matrix entries must be -1, 0 or 1, got {bad}"
        )));
    }

    let flat: Vec<i32> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((nrows, ncols), flat)
        .map_err(|e| NcpsError::wiring(format!("invalid matrix shape ({nrows}x{ncols}): {e}")))
}

fn matrix_to_rows(matrix: &Array2<i32>) -> Vec<Vec<i32>> {
    matrix.outer_iter().map(|row| row.to_vec()).collect()
}

impl Wiring for FullyConnected {
    fn units(&self) -> usize {
        self.units
    }

    fn input_dim(&self) -> Option<usize> {
        self.input_dim
    }

    fn output_dim(&self) -> Option<usize> {
        Some(self.output_dim)
    }

    fn build(&mut self, input_dim: usize) -> Result<()> {
        if let Some(existing) = self.input_dim {
            if existing != input_dim {
                return Err(NcpsError::wiring(format!(
                    "conflicting input dimensions: built with {existing}, got {input_dim}"
                )));
            }
            return Ok(());
        }

        let mut sensory_matrix = Array2::zeros((input_dim, self.units));
        // Offset keeps sensory polarities independent of the internal ones.
        let mut rng = StdRng::seed_from_u64(self.erev_init_seed.wrapping_add(1));
        for src in 0..input_dim {
            for dest in 0..self.units {
                sensory_matrix[[src, dest]] = random_polarity(&mut rng);
            }
        }

        self.input_dim = Some(input_dim);
        self.sensory_adjacency_matrix = Some(sensory_matrix);
        tracing::debug!(
            units = self.units,
            input_dim,
            synapses = self.synapse_count(),
            "built fully connected wiring"
        );
        Ok(())
    }

    fn adjacency_matrix(&self) -> &Array2<i32> {
        &self.adjacency_matrix
    }

    fn sensory_adjacency_matrix(&self) -> Option<&Array2<i32>> {
        self.sensory_adjacency_matrix.as_ref()
    }

    fn add_synapse(&mut self, src: usize, dest: usize, polarity: i32) -> Result<()> {
        if src >= self.units || dest >= self.units {
            return Err(NcpsError::wiring(format!(
                "invalid synapse: src={src}, dest={dest}, units={}",
                self.units
            )));
        }
        check_polarity(polarity)?;
        self.adjacency_matrix[[src, dest]] = polarity;
        Ok(())
    }

    fn add_sensory_synapse(&mut self, src: usize, dest: usize, polarity: i32) -> Result<()> {
        let units = self.units;
        let input_dim = self.input_dim;
        let matrix = self.sensory_adjacency_matrix.as_mut().ok_or_else(|| {
            NcpsError::wiring("wiring must be built before adding sensory synapses")
        })?;
        let input_dim = input_dim.unwrap_or(0);
        if src >= input_dim || dest >= units {
            return Err(NcpsError::wiring(format!(
                "invalid sensory synapse: src={src}, dest={dest}, input_dim={input_dim}, units={units}"
            )));
        }
        check_polarity(polarity)?;
        matrix[[src, dest]] = polarity;
        Ok(())
    }

    fn get_config(&self) -> WiringConfig {
        WiringConfig {
            units: self.units,
            adjacency_matrix: Some(matrix_to_rows(&self.adjacency_matrix)),
            sensory_adjacency_matrix: self.sensory_adjacency_matrix.as_ref().map(matrix_to_rows),
            input_dim: self.input_dim,
            output_dim: Some(self.output_dim),
            erev_init_seed: Some(self.erev_init_seed),
            self_connections: Some(self.self_connections),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_polarities() {
        let a = FullyConnected::new(6, None, 7, true);
        let b = FullyConnected::new(6, None, 7, true);
        assert_eq!(a.adjacency_matrix(), b.adjacency_matrix());
    }

    #[test]
    fn test_no_self_connections() {
        let fc = FullyConnected::new(5, None, 3, false);
        for i in 0..5 {
            assert_eq!(fc.adjacency_matrix()[[i, i]], 0);
        }
        assert_eq!(fc.synapse_count(), 20);
    }

    #[test]
    fn test_output_dim_capped_to_units() {
        let fc = FullyConnected::new(4, Some(10), 3, true);
        assert_eq!(fc.output_dim(), Some(4));
    }

    #[test]
    fn test_sensory_synapse_requires_build() {
        let mut fc = FullyConnected::new(4, None, 3, true);
        assert!(fc.add_sensory_synapse(0, 0, 1).is_err());
        fc.build(2).unwrap();
        assert!(fc.add_sensory_synapse(1, 3, -1).is_ok());
        assert_eq!(fc.sensory_adjacency_matrix().unwrap()[[1, 3]], -1);
        assert!(fc.add_sensory_synapse(2, 0, 1).is_err());
    }

    #[test]
    fn test_invalid_polarity() {
        let mut fc = FullyConnected::new(4, None, 3, true);
        let err = fc.add_synapse(0, 1, 2).unwrap_err();
        assert!(err.to_string().contains("polarity"));
    }
}
