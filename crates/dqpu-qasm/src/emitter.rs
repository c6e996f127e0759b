//! Canonical circuit text writer.

use dqpu_ir::{Circuit, Operation};

/// Serialize a circuit to canonical text.
///
/// Lines are joined with `\n` and there is no trailing newline. A circuit
/// ending in a full identity measurement block is written with the
/// `measure q -> c;` shorthand.
pub fn serialize(circuit: &Circuit) -> String {
    let mut emitter = Emitter::new();
    emitter.emit_circuit(circuit);
    emitter.finish()
}

struct Emitter {
    lines: Vec<String>,
}

impl Emitter {
    fn new() -> Self {
        Self { lines: Vec::new() }
    }

    fn writeln(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    fn finish(self) -> String {
        self.lines.join("\n")
    }

    fn emit_circuit(&mut self, circuit: &Circuit) {
        self.writeln("OPENQASM 2.0;");
        self.writeln("include \"qelib1.inc\";");
        self.writeln(format!("qreg q[{}];", circuit.num_qubits()));
        if circuit.num_clbits() > 0 {
            self.writeln(format!("creg c[{}];", circuit.num_clbits()));
        }

        let shorthand = circuit.num_qubits() > 0 && circuit.is_measured_all();
        for op in circuit.operations() {
            match op {
                Operation::Gate { .. } => self.emit_gate(op),
                Operation::Measure { qubit, clbit } if !shorthand => {
                    self.writeln(format!("measure q[{}] -> c[{}];", qubit.0, clbit.0));
                }
                Operation::Measure { .. } => {}
            }
        }
        if shorthand {
            self.writeln("measure q -> c;");
        }
    }

    fn emit_gate(&mut self, op: &Operation) {
        let Operation::Gate {
            gate,
            qubits,
            param,
        } = op
        else {
            return;
        };
        let operands = qubits
            .iter()
            .map(|q| format!("q[{}]", q.0))
            .collect::<Vec<_>>()
            .join(", ");
        let line = match param {
            Some(p) => format!("{}({p}) {operands};", gate.qasm_name()),
            None => format!("{} {operands};", gate.qasm_name()),
        };
        self.writeln(line);
    }
}
