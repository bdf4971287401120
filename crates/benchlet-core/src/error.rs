//! Error types for benchlet

use thiserror::Error;

/// Main error type for benchlet
#[derive(Error, Debug)]
pub enum BenchletError {
    /// Missing or malformed catalog, allow-list or settings file
    #[error("Configuration error: {0}")]
    Config(String),

    /// The container runtime could not be invoked
    #[error("Launch error: {0}")]
    Launch(String),

    /// Malformed command-line input
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for benchlet operations
pub type BenchletResult<T> = Result<T, BenchletError>;

impl From<serde_json::Error> for BenchletError {
    fn from(err: serde_json::Error) -> Self {
        BenchletError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for BenchletError {
    fn from(err: serde_yaml::Error) -> Self {
        BenchletError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for BenchletError {
    fn from(err: toml::de::Error) -> Self {
        BenchletError::Config(err.to_string())
    }
}
