//! DQPU sampler abstraction
//!
//! Nodes never talk to a quantum execution engine directly. They go through
//! the [`Sampler`] capability, created by name from a [`SamplerRegistry`],
//! and receive an [`ExperimentResult`] of bitstring counts.
//!
//! # Implementing a Sampler
//!
//! ```ignore
//! use async_trait::async_trait;
//! use dqpu_hal::{ExperimentResult, HalResult, Sampler};
//! use dqpu_ir::Circuit;
//!
//! struct AllZeros;
//!
//! #[async_trait]
//! impl Sampler for AllZeros {
//!     fn name(&self) -> &str { "zeros" }
//!     fn max_qubits(&self) -> u32 { 64 }
//!
//!     async fn sample(&self, circuit: &Circuit, shots: u64) -> HalResult<ExperimentResult> {
//!         let key = "0".repeat(circuit.num_clbits() as usize);
//!         Ok([(key, shots)].into_iter().collect())
//!     }
//! }
//! ```

pub mod error;
pub mod registry;
pub mod result;
pub mod sampler;

pub use error::{HalError, HalResult};
pub use registry::SamplerRegistry;
pub use result::ExperimentResult;
pub use sampler::{SELF_TEST_SHOTS, Sampler, SamplerConfig};
