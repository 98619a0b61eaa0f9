//! Error types for the nlx-core crate.

use thiserror::Error;

/// Top-level error type for explanation requests.
#[derive(Debug, Error)]
pub enum ExplainError {
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Tokenization error: {0}")]
    Tokenization(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Class index {class} out of range for {num_classes} classes")]
    ClassOutOfRange { class: usize, num_classes: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid device: {0}")]
    InvalidDevice(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ExplainError {
    pub fn not_implemented(msg: impl Into<String>) -> Self {
        Self::NotImplemented(msg.into())
    }

    pub fn tokenization(msg: impl Into<String>) -> Self {
        Self::Tokenization(msg.into())
    }

    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    pub fn numerical(msg: impl Into<String>) -> Self {
        Self::Numerical(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<figment::Error> for ExplainError {
    fn from(err: figment::Error) -> Self {
        Self::Config(err.to_string())
    }
}

pub type ExplainResult<T> = Result<T, ExplainError>;
