//! Error types for the IR crate.

use crate::qubit::{ClbitId, QubitId};
use thiserror::Error;

/// Errors raised while building circuits or looking up gates.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum IrError {
    /// Qubit index is outside the circuit.
    #[error("Qubit {qubit} not found in circuit{}", format_gate_context(.gate_name))]
    QubitNotFound {
        /// The offending qubit.
        qubit: QubitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Classical bit index is outside the circuit.
    #[error("Classical bit {clbit} not found in circuit")]
    ClbitNotFound {
        /// The offending classical bit.
        clbit: ClbitId,
    },

    /// Gate applied to the wrong number of qubits.
    #[error("Gate '{gate_name}' requires {expected} qubits, got {got}")]
    QubitCountMismatch {
        /// Name of the gate.
        gate_name: String,
        /// Arity of the gate.
        expected: u32,
        /// Number of operands supplied.
        got: u32,
    },

    /// The same qubit was used twice in one gate.
    #[error("Duplicate qubit {qubit} in operation{}", format_gate_context(.gate_name))]
    DuplicateQubit {
        /// The repeated qubit.
        qubit: QubitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// No catalog entry with this name.
    #[error("Unknown gate '{0}'")]
    UnknownGate(String),

    /// A parametrized gate was used without a parameter.
    #[error("Gate '{0}' needs a parameter")]
    GateNeedsParameter(String),

    /// A parameter was supplied to a fixed gate.
    #[error("Gate '{0}' is not parametrized")]
    GateNotParametrized(String),

    /// A parameter expression does not evaluate to a finite number.
    #[error("Parameter '{0}' does not evaluate to a finite value")]
    InvalidParameter(String),
}

#[allow(clippy::ref_option)]
fn format_gate_context(gate_name: &Option<String>) -> String {
    match gate_name {
        Some(name) => format!(" (gate: {name})"),
        None => String::new(),
    }
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
