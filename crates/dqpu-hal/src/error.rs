//! Error types for the HAL crate.

use thiserror::Error;

/// Errors that can occur while sampling circuits.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HalError {
    /// No sampler registered under this name.
    #[error("Sampler not available: {0}")]
    SamplerUnavailable(String),

    /// Circuit cannot be run by this sampler.
    #[error("Invalid circuit: {0}")]
    InvalidCircuit(String),

    /// Circuit exceeds sampler capabilities.
    #[error("Circuit exceeds sampler capabilities: {0}")]
    CircuitTooLarge(String),

    /// Sampling failed.
    #[error("Sampling failed: {0}")]
    SamplingFailed(String),

    /// Circuit model error.
    #[error("Circuit error: {0}")]
    Circuit(#[from] dqpu_ir::IrError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type for HAL operations.
pub type HalResult<T> = Result<T, HalError>;
