//! Error types for the circuit text parser.

use thiserror::Error;

/// Errors that can occur during parsing.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Lexer error (invalid token).
    #[error("Lexer error at line {line}: {message}")]
    LexerError { line: usize, message: String },

    /// Unexpected token.
    #[error("Unexpected token at line {line}: expected {expected}, found {found}")]
    UnexpectedToken {
        line: usize,
        expected: String,
        found: String,
    },

    /// Unexpected end of input.
    #[error("Unexpected end of input: {0}")]
    UnexpectedEof(String),

    /// Only `OPENQASM 2.0` is accepted.
    #[error("Invalid OPENQASM version: {0}")]
    InvalidVersion(String),

    /// A register or parameter name that was never declared.
    #[error("Undefined identifier: {0}")]
    UndefinedIdentifier(String),

    /// More than one `qreg` or `creg` declaration.
    #[error("Multiple {0} declarations")]
    MultipleRegisters(&'static str),

    /// No `qreg` declaration.
    #[error("Missing qreg declaration")]
    MissingQubitRegister,

    /// Gate name not in the catalog.
    #[error("Unknown gate: {0}")]
    UnknownGate(String),

    /// Register index that is not an integer literal.
    #[error("Non-trivial index expression for register '{register}' at line {line}")]
    NonTrivialIndex { register: String, line: usize },

    /// Statement following a measurement.
    #[error("Statement after measurement at line {line}")]
    StatementAfterMeasure { line: usize },

    /// Statement kind outside the supported dialect.
    #[error("Unsupported statement at line {line}: {kind}")]
    UnsupportedStatement { kind: String, line: usize },

    /// Expression outside `+ - * /`, numbers and `pi`.
    #[error("Unsupported expression: {0}")]
    UnsupportedExpression(String),

    /// Wrong number of qubit operands.
    #[error("Gate '{gate}' expects {expected} qubits, got {got}")]
    WrongQubitCount {
        gate: String,
        expected: usize,
        got: usize,
    },

    /// Wrong number of parameters.
    #[error("Gate '{gate}' expects {expected} parameters, got {got}")]
    WrongParameterCount {
        gate: String,
        expected: usize,
        got: usize,
    },

    /// Index out of bounds.
    #[error("Index {index} out of bounds for register '{register}' of size {size}")]
    IndexOutOfBounds {
        register: String,
        index: u64,
        size: u32,
    },

    /// `measure q -> c` over registers of different sizes.
    #[error("Cannot measure register of size {qubits} into register of size {clbits}")]
    RegisterSizeMismatch { qubits: u32, clbits: u32 },

    /// IR error during circuit construction.
    #[error("Circuit error: {0}")]
    CircuitError(#[from] dqpu_ir::IrError),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;
