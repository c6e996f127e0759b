//! DQPU circuit model
//!
//! This crate holds the data structures every other DQPU crate works on: the
//! [`Circuit`] with its closed [`Operation`] enum, and the read-only gate
//! catalog addressed by [`GateId`].
//!
//! # Example: Building a Bell State
//!
//! ```rust
//! use dqpu_ir::{Circuit, QubitId};
//!
//! let mut circuit = Circuit::new(2, 2);
//! circuit.h(QubitId(0)).unwrap();
//! circuit.cx(QubitId(0), QubitId(1)).unwrap();
//! circuit.measure_all().unwrap();
//!
//! assert_eq!(circuit.num_qubits(), 2);
//! assert_eq!(circuit.depth(), 2);
//! assert!(circuit.is_measured_all());
//! ```
//!
//! # Example: Gate Lookup
//!
//! ```rust
//! use dqpu_ir::GateId;
//!
//! let gate = GateId::from_qasm("cr").unwrap();
//! assert_eq!(gate.arity(), 2);
//! assert!(gate.is_parametrized());
//! let m = gate.gate().matrix_with(2.0).unwrap();
//! assert_eq!(m.dim(), (4, 4));
//! ```

pub mod circuit;
pub mod error;
pub mod gate;
pub mod operation;
pub mod parameter;
pub mod qubit;

pub use circuit::Circuit;
pub use error::{IrError, IrResult};
pub use gate::{Gate, GateId, Matrix, catalog};
pub use operation::Operation;
pub use parameter::ParameterExpression;
pub use qubit::{ClbitId, QubitId};
