// ocular-core/src/errors.rs
use thiserror::Error;

/// Errors raised while loading or validating Ocular configuration.
#[derive(Error, Debug)]
pub enum OcularError {
    /// Error related to configuration loading or validation.
    #[error("Configuration Error: {0}")]
    Config(String),

    /// Error reading a configuration or environment file.
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),
}

impl OcularError {
    pub fn config(msg: impl Into<String>) -> Self {
        OcularError::Config(msg.into())
    }
}
