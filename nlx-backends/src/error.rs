//! Error types for the nlx-backends crate.

use nlx_core::ExplainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Response(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackendError {
    pub fn tokenizer(msg: impl Into<String>) -> Self {
        Self::Tokenizer(msg.into())
    }

    pub fn response(msg: impl Into<String>) -> Self {
        Self::Response(msg.into())
    }
}

impl From<BackendError> for ExplainError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Tokenizer(msg) => ExplainError::Tokenization(msg),
            other => ExplainError::Model(other.to_string()),
        }
    }
}
