//! OpenQASM 2 reader and writer for DQPU circuits
//!
//! This crate reads and writes the restricted OpenQASM 2 dialect that jobs
//! are exchanged in. Parsing is strict: anything outside the dialect is an
//! error, never silently dropped.
//!
//! # Supported Features
//!
//! | Feature | Example |
//! |---------|---------|
//! | Version header (optional) | `OPENQASM 2.0;` |
//! | Standard include | `include "qelib1.inc";` |
//! | One qubit register | `qreg q[5];` |
//! | At most one classical register | `creg c[5];` |
//! | Catalog gates | `h q[0];`, `cx q[0], q[1];` |
//! | Parametrized gates | `p(pi/32) q[0];`, `cr(3) q[0], q[1];` |
//! | Terminal measurements | `measure q -> c;`, `measure q[0] -> c[1];` |
//! | Comments | `// comment` |
//!
//! `barrier`, `reset`, `if`, `gate`, `opaque`, whole-register gate
//! application and any statement after a measurement are rejected.
//!
//! # Example: Round-Trip
//!
//! ```rust
//! use dqpu_qasm::{parse, serialize};
//!
//! let text = "OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg q[2];\ncreg c[2];\nh q[0];\ncx q[0], q[1];\nmeasure q -> c;";
//!
//! let circuit = parse(text).unwrap();
//! assert_eq!(circuit.num_qubits(), 2);
//! assert_eq!(serialize(&circuit), text);
//! ```

mod ast;
mod emitter;
mod error;
mod lexer;
mod parser;

pub use emitter::serialize;
pub use error::{ParseError, ParseResult};
pub use parser::{parse, parse_ast};

/// AST types for callers that need the unlowered program.
pub mod syntax {
    pub use crate::ast::*;
}
