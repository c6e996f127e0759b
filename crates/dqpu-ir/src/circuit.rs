//! High-level circuit builder API.

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::GateId;
use crate::operation::Operation;
use crate::parameter::ParameterExpression;
use crate::qubit::{ClbitId, QubitId};

/// A quantum circuit: register sizes and an ordered list of operations.
///
/// Every builder method validates its operands, so a `Circuit` value always
/// satisfies the operand invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    num_qubits: u32,
    num_clbits: u32,
    operations: Vec<Operation>,
}

impl Circuit {
    /// Create an empty circuit.
    pub fn new(num_qubits: u32, num_clbits: u32) -> Self {
        Self {
            num_qubits,
            num_clbits,
            operations: vec![],
        }
    }

    /// Build a circuit from parts, validating every operation.
    pub fn from_operations(
        num_qubits: u32,
        num_clbits: u32,
        operations: impl IntoIterator<Item = Operation>,
    ) -> IrResult<Self> {
        let mut circuit = Self::new(num_qubits, num_clbits);
        for op in operations {
            circuit.push(op)?;
        }
        Ok(circuit)
    }

    /// Append an operation after validating it.
    pub fn push(&mut self, op: Operation) -> IrResult<&mut Self> {
        self.validate(&op)?;
        self.operations.push(op);
        Ok(self)
    }

    /// Apply a fixed gate.
    pub fn apply(&mut self, gate: GateId, qubits: &[QubitId]) -> IrResult<&mut Self> {
        self.push(Operation::gate(gate, qubits.iter().copied()))
    }

    /// Apply a parametrized gate.
    pub fn apply_parametrized(
        &mut self,
        gate: GateId,
        param: impl Into<ParameterExpression>,
        qubits: &[QubitId],
    ) -> IrResult<&mut Self> {
        self.push(Operation::parametrized(gate, param, qubits.iter().copied()))
    }

    /// Apply Hadamard gate.
    pub fn h(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(GateId::H, &[qubit])
    }

    /// Apply Pauli-X gate.
    pub fn x(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(GateId::X, &[qubit])
    }

    /// Apply Pauli-Z gate.
    pub fn z(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(GateId::Z, &[qubit])
    }

    /// Apply phase gate.
    pub fn p(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_parametrized(GateId::P, theta, &[qubit])
    }

    /// Apply CNOT gate.
    pub fn cx(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.apply(GateId::CX, &[control, target])
    }

    /// Apply CZ gate.
    pub fn cz(&mut self, a: QubitId, b: QubitId) -> IrResult<&mut Self> {
        self.apply(GateId::CZ, &[a, b])
    }

    /// Apply SWAP gate.
    pub fn swap(&mut self, a: QubitId, b: QubitId) -> IrResult<&mut Self> {
        self.apply(GateId::SWAP, &[a, b])
    }

    /// Measure a qubit into a classical bit.
    pub fn measure(&mut self, qubit: QubitId, clbit: ClbitId) -> IrResult<&mut Self> {
        self.push(Operation::measure(qubit, clbit))
    }

    /// Measure a qubit into the classical bit of the same index.
    pub fn measure_qubit(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.measure(qubit, ClbitId(qubit.0))
    }

    /// Measure every qubit `i` into classical bit `i`, growing the classical
    /// register to the qubit count if needed.
    pub fn measure_all(&mut self) -> IrResult<&mut Self> {
        self.num_clbits = self.num_clbits.max(self.num_qubits);
        for i in 0..self.num_qubits {
            self.measure(QubitId(i), ClbitId(i))?;
        }
        Ok(self)
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// Number of classical bits.
    pub fn num_clbits(&self) -> u32 {
        self.num_clbits
    }

    /// Operations in program order.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Consume the circuit, returning its operations.
    pub fn into_operations(self) -> Vec<Operation> {
        self.operations
    }

    /// Number of gate operations. This is the job `depth` reported to the
    /// ledger on submission.
    pub fn depth(&self) -> usize {
        self.operations.iter().filter(|op| op.is_gate()).count()
    }

    /// Gate operations in program order.
    pub fn gates(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter().filter(|op| op.is_gate())
    }

    /// Measurement operations in program order.
    pub fn measurements(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter().filter(|op| op.is_measure())
    }

    /// True when no gate follows a measurement.
    pub fn has_terminal_measurements(&self) -> bool {
        let first_measure = self.operations.iter().position(Operation::is_measure);
        match first_measure {
            Some(at) => self.operations[at..].iter().all(Operation::is_measure),
            None => true,
        }
    }

    /// True when the circuit ends with exactly `measure q[i] -> c[i]` for
    /// every qubit in order and the registers have the same size.
    pub fn is_measured_all(&self) -> bool {
        if self.num_qubits != self.num_clbits {
            return false;
        }
        let n = self.num_qubits as usize;
        if self.operations.len() < n {
            return false;
        }
        let (prefix, block) = self.operations.split_at(self.operations.len() - n);
        prefix.iter().all(Operation::is_gate)
            && block.iter().enumerate().all(|(i, op)| {
                matches!(op, Operation::Measure { qubit, clbit }
                    if qubit.index() == i && clbit.index() == i)
            })
    }

    fn validate(&self, op: &Operation) -> IrResult<()> {
        match op {
            Operation::Gate {
                gate,
                qubits,
                param,
            } => {
                let name = gate.name();
                let got = u32::try_from(qubits.len()).unwrap_or(u32::MAX);
                if got != gate.arity() {
                    return Err(IrError::QubitCountMismatch {
                        gate_name: name.into(),
                        expected: gate.arity(),
                        got,
                    });
                }
                match (gate.is_parametrized(), param.is_some()) {
                    (true, false) => return Err(IrError::GateNeedsParameter(name.into())),
                    (false, true) => return Err(IrError::GateNotParametrized(name.into())),
                    _ => {}
                }
                for (i, &qubit) in qubits.iter().enumerate() {
                    self.check_qubit(qubit, Some(name))?;
                    if qubits[..i].contains(&qubit) {
                        return Err(IrError::DuplicateQubit {
                            qubit,
                            gate_name: Some(name.into()),
                        });
                    }
                }
                Ok(())
            }
            Operation::Measure { qubit, clbit } => {
                self.check_qubit(*qubit, None)?;
                if clbit.0 >= self.num_clbits {
                    return Err(IrError::ClbitNotFound { clbit: *clbit });
                }
                Ok(())
            }
        }
    }

    fn check_qubit(&self, qubit: QubitId, gate_name: Option<&str>) -> IrResult<()> {
        if qubit.0 >= self.num_qubits {
            return Err(IrError::QubitNotFound {
                qubit,
                gate_name: gate_name.map(String::from),
            });
        }
        Ok(())
    }

    // =========================================================================
    // Pre-built circuits
    // =========================================================================

    /// Bell state with both qubits measured.
    pub fn bell() -> IrResult<Self> {
        let mut circuit = Circuit::new(2, 2);
        circuit.h(QubitId(0))?.cx(QubitId(0), QubitId(1))?;
        circuit.measure_all()?;
        Ok(circuit)
    }

    /// GHZ state on `n` qubits with every qubit measured.
    pub fn ghz(n: u32) -> IrResult<Self> {
        let mut circuit = Circuit::new(n, n);
        if n > 0 {
            circuit.h(QubitId(0))?;
            for i in 1..n {
                circuit.cx(QubitId(0), QubitId(i))?;
            }
        }
        circuit.measure_all()?;
        Ok(circuit)
    }
}
