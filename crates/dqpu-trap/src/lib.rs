//! Trap-based verification of untrusted sampling.
//!
//! A verifier cannot re-run a job to check a sampler's answer. Instead it
//! inserts trap qubits with known statistics before the job is published,
//! and checks those statistics in the returned counts.
//!
//! ```text
//!   trap(circuit) ──→ (augmented, traps) ──→ sampler ──→ counts
//!                                                          │
//!                 verify(traps, counts) ←──────────────────┤
//!         untrap_results(traps, counts) ←──────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use dqpu_hal::ExperimentResult;
//! use dqpu_ir::Circuit;
//! use dqpu_trap::{BasicTrapper, Trapper};
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let circuit = Circuit::bell().unwrap();
//! let mut rng = StdRng::seed_from_u64(1);
//! let trapped = BasicTrapper.trap(&circuit, 1, &mut rng).unwrap();
//! assert_eq!(trapped.circuit.num_qubits(), 3);
//!
//! let untrapped = BasicTrapper.untrap_results(&trapped.traps, &ExperimentResult::new());
//! assert!(untrapped.is_empty());
//! ```

pub mod basic;
pub mod error;
pub mod info;
pub mod trapper;

pub use basic::{BASIC_METHOD, BIAS_TOLERANCE, BasicTrapper};
pub use error::{TrapError, TrapResult};
pub use info::{TrapInfo, dump_traps, load_traps};
pub use trapper::{Trapped, Trapper, remap_qubit, untrap_results};

/// Look up a strategy by method tag.
pub fn trapper_for(method: &str) -> TrapResult<Box<dyn Trapper>> {
    match method {
        BASIC_METHOD => Ok(Box::new(BasicTrapper)),
        other => Err(TrapError::UnknownMethod(other.into())),
    }
}
