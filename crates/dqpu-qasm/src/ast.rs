//! Abstract syntax tree for the OpenQASM 2 dialect.

use serde::{Deserialize, Serialize};

/// A parsed program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    /// Version from the `OPENQASM` header, if present.
    pub version: Option<String>,
    /// Statements in source order.
    pub statements: Vec<Located<Statement>>,
}

/// A node tagged with the source line it starts on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Located<T> {
    pub line: usize,
    pub node: T,
}

/// A statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Statement {
    /// `include "file";`
    Include(String),

    /// `qreg name[size];`
    QregDecl { name: String, size: u32 },

    /// `creg name[size];`
    CregDecl { name: String, size: u32 },

    /// Gate application.
    Gate(GateCall),

    /// `measure a -> b;`
    Measure { qubit: Argument, bit: Argument },
}

/// A gate call: `name(params) args;`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateCall {
    pub name: String,
    pub params: Vec<Expression>,
    pub args: Vec<Argument>,
}

/// A register operand: `q` or `q[index]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Argument {
    /// Whole register.
    Register(String),
    /// One register element. The index is kept as an expression so that
    /// lowering can reject anything but an integer literal.
    Indexed { register: String, index: Expression },
}

impl Argument {
    /// The register name.
    pub fn register(&self) -> &str {
        match self {
            Argument::Register(name) | Argument::Indexed { register: name, .. } => name,
        }
    }
}

/// An expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expression {
    Int(u64),
    Float(f64),
    Pi,
    Identifier(String),
    Neg(Box<Expression>),
    Paren(Box<Expression>),
    BinOp {
        left: Box<Expression>,
        op: BinOp,
        right: Box<Expression>,
    },
    FnCall {
        name: String,
        args: Vec<Expression>,
    },
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Pow => "^",
        };
        f.write_str(s)
    }
}
