//! The gate catalog.
//!
//! Gates live in a fixed, process-wide table indexed by [`GateId`]. Operations
//! reference gates by id only; matrices are built on demand.

use ndarray::{Array2, array};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_1_SQRT_2, PI};
use std::fmt;

use crate::error::{IrError, IrResult};

/// A dense unitary: 2×2 for single-qubit gates, 4×4 for two-qubit gates.
///
/// Two-qubit matrices use basis index `2·b(op0) + b(op1)`, so for `CX` the
/// first operand is the control.
pub type Matrix = Array2<Complex64>;

/// Identifier of a catalog gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateId {
    /// Identity.
    I,
    /// Pauli-X.
    X,
    /// Pauli-Y.
    Y,
    /// Pauli-Z.
    Z,
    /// S gate (sqrt(Z)).
    S,
    /// T gate (fourth root of Z).
    T,
    /// Hadamard.
    H,
    /// Phase gate `diag(1, e^{iθ})`.
    P,
    /// Rotation around X.
    RX,
    /// Rotation around Y.
    RY,
    /// Rotation around Z.
    RZ,
    /// Phase of `e^{2πi/2^k}`, the QFT rotation.
    R,
    /// Controlled-X.
    CX,
    /// Controlled-Z.
    CZ,
    /// SWAP.
    SWAP,
    /// Controlled phase.
    CP,
    /// Controlled `R(k)`.
    CR,
}

enum Definition {
    Fixed(fn() -> Matrix),
    Parametrized(fn(f64) -> Matrix),
}

/// A catalog entry.
pub struct Gate {
    id: GateId,
    name: &'static str,
    qasm_name: &'static str,
    arity: u32,
    definition: Definition,
}

// Ordered by `GateId` discriminant.
static CATALOG: [Gate; 17] = [
    Gate::fixed(GateId::I, "I", "id", 1, identity),
    Gate::fixed(GateId::X, "X", "x", 1, pauli_x),
    Gate::fixed(GateId::Y, "Y", "y", 1, pauli_y),
    Gate::fixed(GateId::Z, "Z", "z", 1, pauli_z),
    Gate::fixed(GateId::S, "S", "s", 1, s_gate),
    Gate::fixed(GateId::T, "T", "t", 1, t_gate),
    Gate::fixed(GateId::H, "H", "h", 1, hadamard),
    Gate::parametrized(GateId::P, "P", "p", 1, phase),
    Gate::parametrized(GateId::RX, "RX", "rx", 1, rx),
    Gate::parametrized(GateId::RY, "RY", "ry", 1, ry),
    Gate::parametrized(GateId::RZ, "RZ", "rz", 1, rz),
    Gate::parametrized(GateId::R, "R", "r", 1, r_k),
    Gate::fixed(GateId::CX, "CX", "cx", 2, cx),
    Gate::fixed(GateId::CZ, "CZ", "cz", 2, cz),
    Gate::fixed(GateId::SWAP, "SWAP", "swap", 2, swap),
    Gate::parametrized(GateId::CP, "CP", "cp", 2, cphase),
    Gate::parametrized(GateId::CR, "CR", "cr", 2, cr_k),
];

impl Gate {
    const fn fixed(
        id: GateId,
        name: &'static str,
        qasm_name: &'static str,
        arity: u32,
        matrix: fn() -> Matrix,
    ) -> Self {
        Self {
            id,
            name,
            qasm_name,
            arity,
            definition: Definition::Fixed(matrix),
        }
    }

    const fn parametrized(
        id: GateId,
        name: &'static str,
        qasm_name: &'static str,
        arity: u32,
        matrix: fn(f64) -> Matrix,
    ) -> Self {
        Self {
            id,
            name,
            qasm_name,
            arity,
            definition: Definition::Parametrized(matrix),
        }
    }

    /// Catalog id.
    pub fn id(&self) -> GateId {
        self.id
    }

    /// Catalog name (`"CX"`).
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Name in the circuit text format (`"cx"`).
    pub fn qasm_name(&self) -> &'static str {
        self.qasm_name
    }

    /// Number of qubits the gate acts on.
    pub fn arity(&self) -> u32 {
        self.arity
    }

    /// Whether the gate takes one real parameter.
    pub fn is_parametrized(&self) -> bool {
        matches!(self.definition, Definition::Parametrized(_))
    }

    /// Matrix of a fixed gate.
    pub fn matrix(&self) -> IrResult<Matrix> {
        match self.definition {
            Definition::Fixed(f) => Ok(f()),
            Definition::Parametrized(_) => Err(IrError::GateNeedsParameter(self.name.into())),
        }
    }

    /// Matrix of a parametrized gate for the given parameter.
    pub fn matrix_with(&self, param: f64) -> IrResult<Matrix> {
        match self.definition {
            Definition::Parametrized(f) => Ok(f(param)),
            Definition::Fixed(_) => Err(IrError::GateNotParametrized(self.name.into())),
        }
    }
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gate")
            .field("id", &self.id)
            .field("arity", &self.arity)
            .field("parametrized", &self.is_parametrized())
            .finish()
    }
}

impl GateId {
    /// The catalog entry for this id.
    pub fn gate(self) -> &'static Gate {
        &CATALOG[self as usize]
    }

    /// Catalog name.
    pub fn name(self) -> &'static str {
        self.gate().name
    }

    /// Name in the circuit text format.
    pub fn qasm_name(self) -> &'static str {
        self.gate().qasm_name
    }

    /// Number of qubits the gate acts on.
    pub fn arity(self) -> u32 {
        self.gate().arity
    }

    /// Whether the gate takes one real parameter.
    pub fn is_parametrized(self) -> bool {
        self.gate().is_parametrized()
    }

    /// Look up a gate by catalog name, ignoring case.
    pub fn from_name(name: &str) -> IrResult<GateId> {
        CATALOG
            .iter()
            .find(|g| g.name.eq_ignore_ascii_case(name))
            .map(|g| g.id)
            .ok_or_else(|| IrError::UnknownGate(name.into()))
    }

    /// Look up a gate by its circuit-text name. `CX` is accepted as an alias of `cx`.
    pub fn from_qasm(name: &str) -> IrResult<GateId> {
        if name == "CX" {
            return Ok(GateId::CX);
        }
        CATALOG
            .iter()
            .find(|g| g.qasm_name == name)
            .map(|g| g.id)
            .ok_or_else(|| IrError::UnknownGate(name.into()))
    }
}

impl fmt::Display for GateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// All catalog entries, in id order.
pub fn catalog() -> &'static [Gate] {
    &CATALOG
}

fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

fn cis(theta: f64) -> Complex64 {
    Complex64::from_polar(1.0, theta)
}

/// Angle of `R(k)`: `2π / 2^k`.
fn r_angle(k: f64) -> f64 {
    2.0 * PI / 2f64.powf(k)
}

fn identity() -> Matrix {
    array![[c(1., 0.), c(0., 0.)], [c(0., 0.), c(1., 0.)]]
}

fn pauli_x() -> Matrix {
    array![[c(0., 0.), c(1., 0.)], [c(1., 0.), c(0., 0.)]]
}

fn pauli_y() -> Matrix {
    array![[c(0., 0.), c(0., -1.)], [c(0., 1.), c(0., 0.)]]
}

fn pauli_z() -> Matrix {
    array![[c(1., 0.), c(0., 0.)], [c(0., 0.), c(-1., 0.)]]
}

fn s_gate() -> Matrix {
    phase(PI / 2.0)
}

fn t_gate() -> Matrix {
    phase(PI / 4.0)
}

fn hadamard() -> Matrix {
    let h = FRAC_1_SQRT_2;
    array![[c(h, 0.), c(h, 0.)], [c(h, 0.), c(-h, 0.)]]
}

fn phase(theta: f64) -> Matrix {
    array![[c(1., 0.), c(0., 0.)], [c(0., 0.), cis(theta)]]
}

fn rx(theta: f64) -> Matrix {
    let (sin, cos) = (theta / 2.0).sin_cos();
    array![[c(cos, 0.), c(0., -sin)], [c(0., -sin), c(cos, 0.)]]
}

fn ry(theta: f64) -> Matrix {
    let (sin, cos) = (theta / 2.0).sin_cos();
    array![[c(cos, 0.), c(-sin, 0.)], [c(sin, 0.), c(cos, 0.)]]
}

fn rz(theta: f64) -> Matrix {
    array![
        [cis(-theta / 2.0), c(0., 0.)],
        [c(0., 0.), cis(theta / 2.0)]
    ]
}

fn r_k(k: f64) -> Matrix {
    phase(r_angle(k))
}

fn diagonal4(d: [Complex64; 4]) -> Matrix {
    Array2::from_diag(&ndarray::arr1(&d))
}

fn cx() -> Matrix {
    let (o, l) = (c(0., 0.), c(1., 0.));
    array![[l, o, o, o], [o, l, o, o], [o, o, o, l], [o, o, l, o]]
}

fn cz() -> Matrix {
    diagonal4([c(1., 0.), c(1., 0.), c(1., 0.), c(-1., 0.)])
}

fn swap() -> Matrix {
    let (o, l) = (c(0., 0.), c(1., 0.));
    array![[l, o, o, o], [o, o, l, o], [o, l, o, o], [o, o, o, l]]
}

fn cphase(theta: f64) -> Matrix {
    diagonal4([c(1., 0.), c(1., 0.), c(1., 0.), cis(theta)])
}

fn cr_k(k: f64) -> Matrix {
    cphase(r_angle(k))
}
