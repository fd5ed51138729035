//! The two benchmark runs: a cell comparison on a sine/cosine task and a
//! CfC regressor on a sequence-sum task.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::NcpsError;

pub mod cell_comparison;
pub mod liquid;

pub use cell_comparison::ComparisonReport;
pub use liquid::{LiquidReport, SplitEval};

/// Recurrent cell families the comparison can train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    Ctrnn,
    Ctgru,
    Eltc,
    Cfc,
}

impl CellKind {
    pub const ALL: [CellKind; 4] = [
        CellKind::Ctrnn,
        CellKind::Ctgru,
        CellKind::Eltc,
        CellKind::Cfc,
    ];

    /// Display label used in progress output.
    pub fn label(self) -> &'static str {
        match self {
            CellKind::Ctrnn => "CTRNN",
            CellKind::Ctgru => "CTGRU",
            CellKind::Eltc => "ELTC",
            CellKind::Cfc => "CfC",
        }
    }
}

impl FromStr for CellKind {
    type Err = NcpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ctrnn" => Ok(CellKind::Ctrnn),
            "ctgru" => Ok(CellKind::Ctgru),
            "eltc" => Ok(CellKind::Eltc),
            "cfc" => Ok(CellKind::Cfc),
            other => Err(NcpsError::invalid_config(format!(
                "unknown cell kind {other:?}, expected one of ctrnn, ctgru, eltc, cfc"
            ))),
        }
    }
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
