//! AST-to-Circuit lowering.

use dqpu_ir::{Circuit, ClbitId, GateId, IrError, Operation, ParameterExpression, QubitId};

use crate::ast::{Argument, BinOp, Expression, GateCall, Located, Program, Statement};
use crate::error::{ParseError, ParseResult};

/// Lower an AST Program to a Circuit.
pub(crate) fn lower_to_circuit(program: &Program) -> ParseResult<Circuit> {
    let mut lowerer = Lowerer::declare(program)?;
    lowerer.lower(program)?;
    Ok(lowerer.circuit)
}

/// A declared register.
struct Register {
    name: String,
    size: u32,
}

struct Lowerer {
    qreg: Register,
    creg: Option<Register>,
    circuit: Circuit,
    measured: bool,
}

impl Lowerer {
    /// First pass: collect the single `qreg` and optional `creg`.
    fn declare(program: &Program) -> ParseResult<Self> {
        let mut qreg = None;
        let mut creg = None;

        for Located { node, .. } in &program.statements {
            match node {
                Statement::QregDecl { name, size } => {
                    if qreg.is_some() {
                        return Err(ParseError::MultipleRegisters("qreg"));
                    }
                    qreg = Some(Register {
                        name: name.clone(),
                        size: *size,
                    });
                }
                Statement::CregDecl { name, size } => {
                    if creg.is_some() {
                        return Err(ParseError::MultipleRegisters("creg"));
                    }
                    creg = Some(Register {
                        name: name.clone(),
                        size: *size,
                    });
                }
                _ => {}
            }
        }

        let qreg = qreg.ok_or(ParseError::MissingQubitRegister)?;
        let num_clbits = creg.as_ref().map_or(0, |c| c.size);
        let circuit = Circuit::new(qreg.size, num_clbits);

        Ok(Self {
            qreg,
            creg,
            circuit,
            measured: false,
        })
    }

    /// Second pass: lower statements in order.
    fn lower(&mut self, program: &Program) -> ParseResult<()> {
        for Located { line, node } in &program.statements {
            let is_measure = matches!(node, Statement::Measure { .. });
            if self.measured && !is_measure {
                return Err(ParseError::StatementAfterMeasure { line: *line });
            }

            match node {
                Statement::Include(path) => {
                    if path != "qelib1.inc" {
                        return Err(ParseError::UnsupportedStatement {
                            kind: format!("include \"{path}\""),
                            line: *line,
                        });
                    }
                }
                Statement::QregDecl { .. } | Statement::CregDecl { .. } => {}
                Statement::Gate(call) => self.lower_gate_call(call, *line)?,
                Statement::Measure { qubit, bit } => {
                    self.lower_measure(qubit, bit, *line)?;
                    self.measured = true;
                }
            }
        }
        Ok(())
    }

    fn lower_gate_call(&mut self, call: &GateCall, line: usize) -> ParseResult<()> {
        let gate = GateId::from_qasm(&call.name).map_err(|err| match err {
            IrError::UnknownGate(name) => ParseError::UnknownGate(name),
            other => other.into(),
        })?;

        let expected_params = usize::from(gate.is_parametrized());
        if call.params.len() != expected_params {
            return Err(ParseError::WrongParameterCount {
                gate: call.name.clone(),
                expected: expected_params,
                got: call.params.len(),
            });
        }
        if call.args.len() != gate.arity() as usize {
            return Err(ParseError::WrongQubitCount {
                gate: call.name.clone(),
                expected: gate.arity() as usize,
                got: call.args.len(),
            });
        }

        let qubits = call
            .args
            .iter()
            .map(|arg| match arg {
                Argument::Register(_) => Err(ParseError::UnsupportedStatement {
                    kind: "whole-register gate application".into(),
                    line,
                }),
                Argument::Indexed { .. } => self.resolve_qubit(arg, line),
            })
            .collect::<ParseResult<Vec<_>>>()?;

        let param = call.params.first().map(lower_expression).transpose()?;
        self.circuit.push(Operation::Gate {
            gate,
            qubits,
            param,
        })?;
        Ok(())
    }

    fn lower_measure(&mut self, qubit: &Argument, bit: &Argument, line: usize) -> ParseResult<()> {
        match (qubit, bit) {
            (Argument::Register(q), Argument::Register(c)) => {
                self.check_qreg(q)?;
                let creg = self.check_creg(c)?;
                if creg.size != self.qreg.size {
                    return Err(ParseError::RegisterSizeMismatch {
                        qubits: self.qreg.size,
                        clbits: creg.size,
                    });
                }
                for i in 0..self.qreg.size {
                    self.circuit.measure(QubitId(i), ClbitId(i))?;
                }
                Ok(())
            }
            (Argument::Indexed { .. }, Argument::Indexed { .. }) => {
                let q = self.resolve_qubit(qubit, line)?;
                let c = self.resolve_clbit(bit, line)?;
                self.circuit.measure(q, c)?;
                Ok(())
            }
            _ => Err(ParseError::UnsupportedStatement {
                kind: "measurement between a register and a single bit".into(),
                line,
            }),
        }
    }

    fn check_qreg(&self, name: &str) -> ParseResult<&Register> {
        if name == self.qreg.name {
            Ok(&self.qreg)
        } else {
            Err(ParseError::UndefinedIdentifier(name.into()))
        }
    }

    fn check_creg(&self, name: &str) -> ParseResult<&Register> {
        match &self.creg {
            Some(creg) if creg.name == name => Ok(creg),
            _ => Err(ParseError::UndefinedIdentifier(name.into())),
        }
    }

    fn resolve_qubit(&self, arg: &Argument, line: usize) -> ParseResult<QubitId> {
        let register = self.check_qreg(arg.register())?;
        literal_index(arg, register, line).map(QubitId)
    }

    fn resolve_clbit(&self, arg: &Argument, line: usize) -> ParseResult<ClbitId> {
        let register = self.check_creg(arg.register())?;
        literal_index(arg, register, line).map(ClbitId)
    }
}

/// Extract an in-bounds integer-literal index.
fn literal_index(arg: &Argument, register: &Register, line: usize) -> ParseResult<u32> {
    let Argument::Indexed { index, .. } = arg else {
        return Err(ParseError::UnsupportedStatement {
            kind: "whole-register operand".into(),
            line,
        });
    };
    let Expression::Int(index) = index else {
        return Err(ParseError::NonTrivialIndex {
            register: register.name.clone(),
            line,
        });
    };
    match u32::try_from(*index) {
        Ok(i) if i < register.size => Ok(i),
        _ => Err(ParseError::IndexOutOfBounds {
            register: register.name.clone(),
            index: *index,
            size: register.size,
        }),
    }
}

/// Lower a parameter expression, keeping its written structure.
#[allow(clippy::cast_precision_loss)]
fn lower_expression(expr: &Expression) -> ParseResult<ParameterExpression> {
    Ok(match expr {
        Expression::Int(v) => ParameterExpression::Constant(*v as f64),
        Expression::Float(v) => ParameterExpression::Constant(*v),
        Expression::Pi => ParameterExpression::Pi,
        Expression::Paren(inner) => lower_expression(inner)?,
        Expression::Neg(inner) => -lower_expression(inner)?,
        Expression::BinOp { left, op, right } => {
            let l = lower_expression(left)?;
            let r = lower_expression(right)?;
            match op {
                BinOp::Add => l + r,
                BinOp::Sub => l - r,
                BinOp::Mul => l * r,
                BinOp::Div => l / r,
                BinOp::Pow => return Err(ParseError::UnsupportedExpression(op.to_string())),
            }
        }
        Expression::Identifier(name) => return Err(ParseError::UndefinedIdentifier(name.clone())),
        Expression::FnCall { name, .. } => {
            return Err(ParseError::UnsupportedExpression(format!("{name}(...)")));
        }
    })
}
