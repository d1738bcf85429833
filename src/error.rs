//! Error types for distconv.

use thiserror::Error;

/// The main error type for model operations.
#[derive(Debug, Error)]
pub enum DistConvError {
    /// Candle tensor operation failed
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// Malformed model configuration
    #[error("shape error: {0}")]
    Shape(String),

    /// Batch tensors do not match the configured dimensions
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: String, got: String },

    /// Unknown parameter name
    #[error("unknown parameter: {0}")]
    UnknownParam(String),

    /// Checkpoint could not be written or read
    #[error("persistence error: {0}")]
    Persistence(String),
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, DistConvError>;
