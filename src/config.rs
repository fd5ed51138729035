//! Configuration for the benchmark runs.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment.
//! Environment variables are prefixed with `NCPS_` and nested keys are split on
//! `__`, e.g. `NCPS_COMPARE__TRAINING__NUM_EPOCHS=5`.

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::activation::Activation;
use crate::cells::{CfcMode, OdeSolver};
use crate::error::{NcpsError, Result};
use crate::experiments::CellKind;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub compare: CompareConfig,
    pub liquid: LiquidConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        self.compare.validate()?;
        self.liquid.validate()
    }
}

/// Optimizer and training-loop settings shared by both experiments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub num_epochs: usize,
    pub learning_rate: f64,
    pub beta_1: f32,
    pub beta_2: f32,
    pub epsilon: f32,
    /// Global L2 norm cap for the gradients.
    pub max_grad_norm: Option<f64>,
    /// Element-wise cap applied after the norm clip.
    pub max_grad_value: Option<f64>,
    /// Epochs without improvement before stopping.
    pub patience: usize,
    pub min_delta: f64,
    pub log_every: usize,
    /// Evaluate without the autodiff graph every this many epochs; 0 disables.
    pub eval_every: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            num_epochs: 100,
            learning_rate: 0.001,
            beta_1: 0.9,
            beta_2: 0.999,
            epsilon: 1e-8,
            max_grad_norm: Some(0.1),
            max_grad_value: Some(1.0),
            patience: 10,
            min_delta: 0.0,
            log_every: 10,
            eval_every: 50,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate > 0.0) {
            return Err(NcpsError::invalid_config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.patience == 0 {
            return Err(NcpsError::invalid_config("patience must be at least 1"));
        }
        for (name, limit) in [
            ("max_grad_norm", self.max_grad_norm),
            ("max_grad_value", self.max_grad_value),
        ] {
            if let Some(limit) = limit {
                if !(limit > 0.0) {
                    return Err(NcpsError::invalid_config(format!(
                        "{name} must be positive, got {limit}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// The sine/cosine cell comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    pub seq_len: usize,
    pub in_features: usize,
    pub out_features: usize,
    pub units: usize,
    pub cell_clip: f64,
    pub ctgru_memory_slots: usize,
    pub ode_unfolds: usize,
    pub solver: OdeSolver,
    pub seed: u64,
    pub cells: Vec<CellKind>,
    pub training: TrainingConfig,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            seq_len: 1000,
            in_features: 2,
            out_features: 1,
            units: 8,
            cell_clip: 1.0,
            ctgru_memory_slots: 8,
            ode_unfolds: 6,
            solver: OdeSolver::RungeKutta,
            seed: 42,
            cells: vec![CellKind::Ctrnn, CellKind::Ctgru, CellKind::Eltc],
            training: TrainingConfig::default(),
        }
    }
}

impl CompareConfig {
    pub fn validate(&self) -> Result<()> {
        nonzero("compare.seq_len", self.seq_len)?;
        nonzero("compare.units", self.units)?;
        nonzero("compare.out_features", self.out_features)?;
        nonzero("compare.ctgru_memory_slots", self.ctgru_memory_slots)?;
        nonzero("compare.ode_unfolds", self.ode_unfolds)?;
        if self.in_features != 2 {
            return Err(NcpsError::invalid_config(format!(
                "compare.in_features must be 2 for the sine/cosine task, got {}",
                self.in_features
            )));
        }
        if self.out_features > self.units {
            return Err(NcpsError::invalid_config(format!(
                "compare.out_features ({}) cannot exceed compare.units ({})",
                self.out_features, self.units
            )));
        }
        if self.cells.is_empty() {
            return Err(NcpsError::invalid_config("compare.cells is empty"));
        }
        self.training.validate()
    }
}

/// The CfC sequence-sum regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidConfig {
    pub batch_size: usize,
    pub seq_len: usize,
    pub input_dim: usize,
    pub hidden_dim: usize,
    pub output_dim: usize,
    pub backbone_units: usize,
    pub backbone_layers: usize,
    pub backbone_dropout: f64,
    pub mode: CfcMode,
    pub activation: Activation,
    pub train_samples: usize,
    pub test_samples: usize,
    pub seed: u64,
    /// 0 evaluates the freshly initialized model.
    pub train_epochs: usize,
    pub training: TrainingConfig,
}

impl Default for LiquidConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            seq_len: 20,
            input_dim: 16,
            hidden_dim: 32,
            output_dim: 16,
            backbone_units: 64,
            backbone_layers: 2,
            backbone_dropout: 0.1,
            mode: CfcMode::Pure,
            activation: Activation::Tanh,
            train_samples: 1000,
            test_samples: 100,
            seed: 42,
            train_epochs: 0,
            training: TrainingConfig::default(),
        }
    }
}

impl LiquidConfig {
    pub fn validate(&self) -> Result<()> {
        nonzero("liquid.batch_size", self.batch_size)?;
        nonzero("liquid.seq_len", self.seq_len)?;
        nonzero("liquid.input_dim", self.input_dim)?;
        nonzero("liquid.hidden_dim", self.hidden_dim)?;
        nonzero("liquid.output_dim", self.output_dim)?;
        if self.output_dim != self.input_dim {
            return Err(NcpsError::invalid_config(format!(
                "liquid.output_dim ({}) must equal liquid.input_dim ({}): targets are per-feature sums",
                self.output_dim, self.input_dim
            )));
        }
        if !(0.0..1.0).contains(&self.backbone_dropout) {
            return Err(NcpsError::invalid_config(format!(
                "liquid.backbone_dropout must be in [0, 1), got {}",
                self.backbone_dropout
            )));
        }
        for (name, samples) in [
            ("train_samples", self.train_samples),
            ("test_samples", self.test_samples),
        ] {
            if self.batch_size > samples {
                return Err(NcpsError::invalid_config(format!(
                    "liquid.batch_size ({}) exceeds liquid.{name} ({samples})",
                    self.batch_size
                )));
            }
        }
        self.training.validate()
    }
}

fn nonzero(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(NcpsError::invalid_config(format!("{name} must be non-zero")));
    }
    Ok(())
}

/// Load configuration with layered merging.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `NCPS_`)
/// 2. The TOML file at `path`, when given
/// 3. Built-in defaults
///
/// The merged result is validated before it is returned.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = path {
        if !path.exists() {
            return Err(NcpsError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("config file not found: {}", path.display()),
            )));
        }
        figment = figment.merge(Toml::file(path));
    }

    // NCPS_COMPARE__SEED, NCPS_LIQUID__TRAINING__NUM_EPOCHS, etc.
    figment = figment.merge(Env::prefixed("NCPS_").split("__"));

    let config: AppConfig = figment.extract().map_err(Box::new)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.compare.seq_len, 1000);
        assert_eq!(config.compare.training.max_grad_norm, Some(0.1));
        assert_eq!(config.liquid.mode, CfcMode::Pure);
        assert_eq!(config.liquid.train_epochs, 0);
    }

    #[test]
    fn test_rejects_non_positive_learning_rate() {
        let mut config = TrainingConfig::default();
        config.learning_rate = 0.0;
        assert!(config.validate().is_err());
        config.learning_rate = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_batch_larger_than_split() {
        let mut config = LiquidConfig::default();
        config.test_samples = 8;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("test_samples"));
    }

    #[test]
    fn test_rejects_zero_units() {
        let mut config = CompareConfig::default();
        config.units = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = load_config(Some(Path::new("/nonexistent/ncps.toml")));
        assert!(matches!(result, Err(NcpsError::Io(_))));
    }
}
