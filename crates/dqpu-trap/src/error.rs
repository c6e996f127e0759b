//! Error types for trapping.

use thiserror::Error;

/// Errors raised while trapping circuits or reading trap files.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrapError {
    /// A gate follows a measurement, so no terminal measurement block exists.
    #[error("Circuit measures before its last gate; only terminal measurements can be trapped")]
    MidCircuitMeasurement,

    /// Trap method tag with no known strategy.
    #[error("Unknown trap method: {0}")]
    UnknownMethod(String),

    /// Circuit model error while building the trapped circuit.
    #[error("Circuit error: {0}")]
    Circuit(#[from] dqpu_ir::IrError),

    /// Trap file could not be encoded or decoded.
    #[error("Trap file error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for trap operations.
pub type TrapResult<T> = Result<T, TrapError>;
