//! Error types for the meeting search engine.
//!
//! This module defines a unified error enum that covers every error category
//! in the workspace: configuration, I/O, embedding, index consistency and
//! on-disk store integrity.

use thiserror::Error;

/// Unified error type for the meeting search engine.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
/// Errors are returned and propagated, never raised as panics.
#[derive(Error, Debug)]
pub enum AppError {
    /// Application configuration errors (config files, logging setup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Engine parameters that can never work (e.g. chunk overlap >= chunk size)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Caller-supplied arguments that are out of range
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A vector's dimension disagrees with the established index dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Persisted vectors and records disagree with each other
    #[error("Corrupt store: {0}")]
    CorruptStore(String),

    /// The embedding provider failed or timed out
    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether the error can be resolved by discarding and rebuilding the store.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::DimensionMismatch { .. } | AppError::CorruptStore(_)
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
