//! Wiring configurations describing connectivity between cell units.

use serde::{Deserialize, Serialize};

mod base;

pub use base::{FullyConnected, Wiring};

/// Serializable snapshot of a wiring
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WiringConfig {
    pub units: usize,
    pub adjacency_matrix: Option<Vec<Vec<i32>>>,
    pub sensory_adjacency_matrix: Option<Vec<Vec<i32>>>,
    pub input_dim: Option<usize>,
    pub output_dim: Option<usize>,
    pub erev_init_seed: Option<u64>,
    pub self_connections: Option<bool>,
}
