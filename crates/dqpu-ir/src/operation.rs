//! Circuit operations.

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::{GateId, Matrix};
use crate::parameter::ParameterExpression;
use crate::qubit::{ClbitId, QubitId};

/// One step of a circuit: a gate application or a measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    /// Apply a catalog gate to its operands.
    Gate {
        /// The gate.
        gate: GateId,
        /// Operands, in gate order.
        qubits: Vec<QubitId>,
        /// The parameter of a parametrized gate.
        param: Option<ParameterExpression>,
    },
    /// Measure a qubit into a classical bit.
    Measure {
        /// The measured qubit.
        qubit: QubitId,
        /// The destination bit.
        clbit: ClbitId,
    },
}

impl Operation {
    /// A fixed gate application.
    pub fn gate(gate: GateId, qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Operation::Gate {
            gate,
            qubits: qubits.into_iter().collect(),
            param: None,
        }
    }

    /// A parametrized gate application.
    pub fn parametrized(
        gate: GateId,
        param: impl Into<ParameterExpression>,
        qubits: impl IntoIterator<Item = QubitId>,
    ) -> Self {
        Operation::Gate {
            gate,
            qubits: qubits.into_iter().collect(),
            param: Some(param.into()),
        }
    }

    /// A measurement.
    pub fn measure(qubit: QubitId, clbit: ClbitId) -> Self {
        Operation::Measure { qubit, clbit }
    }

    /// Check if this is a gate application.
    pub fn is_gate(&self) -> bool {
        matches!(self, Operation::Gate { .. })
    }

    /// Check if this is a measurement.
    pub fn is_measure(&self) -> bool {
        matches!(self, Operation::Measure { .. })
    }

    /// Qubits touched by the operation.
    pub fn qubits(&self) -> &[QubitId] {
        match self {
            Operation::Gate { qubits, .. } => qubits,
            Operation::Measure { qubit, .. } => std::slice::from_ref(qubit),
        }
    }

    /// Return a copy with every qubit (and, for measurements, the classical
    /// bit) passed through `f`.
    #[must_use]
    pub fn remapped(&self, f: impl Fn(u32) -> u32) -> Self {
        match self {
            Operation::Gate {
                gate,
                qubits,
                param,
            } => Operation::Gate {
                gate: *gate,
                qubits: qubits.iter().map(|q| QubitId(f(q.0))).collect(),
                param: param.clone(),
            },
            Operation::Measure { qubit, clbit } => Operation::Measure {
                qubit: QubitId(f(qubit.0)),
                clbit: ClbitId(f(clbit.0)),
            },
        }
    }

    /// Unitary of a gate operation, with its parameter evaluated.
    ///
    /// Measurements have no unitary and yield `None`.
    pub fn matrix(&self) -> IrResult<Option<Matrix>> {
        match self {
            Operation::Gate {
                gate, param: None, ..
            } => gate.gate().matrix().map(Some),
            Operation::Gate {
                gate,
                param: Some(expr),
                ..
            } => {
                let value = expr
                    .value()
                    .ok_or_else(|| IrError::InvalidParameter(expr.to_string()))?;
                gate.gate().matrix_with(value).map(Some)
            }
            Operation::Measure { .. } => Ok(None),
        }
    }
}
