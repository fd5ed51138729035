//! Error types for the ncps crate.

use thiserror::Error;

/// Top-level error type for cell construction, wiring and training.
#[derive(Debug, Error)]
pub enum NcpsError {
    #[error("Wiring error: {0}")]
    Wiring(String),

    #[error("Unknown activation: {0}")]
    Activation(String),

    #[error("Unknown CfC mode: {0}")]
    Mode(String),

    #[error("Unknown ODE solver: {0}")]
    Solver(String),

    #[error("Shape error: {0}")]
    Shape(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NcpsError {
    pub fn wiring(msg: impl Into<String>) -> Self {
        Self::Wiring(msg.into())
    }

    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }

    pub fn training(msg: impl Into<String>) -> Self {
        Self::Training(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, NcpsError>;
