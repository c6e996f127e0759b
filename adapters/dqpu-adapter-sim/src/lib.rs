//! DQPU local statevector sampler
//!
//! Exact statevector simulation of catalog circuits with measurement outcomes
//! drawn from the final state. Gates are applied from their catalog matrices,
//! so every gate the circuit model knows is supported.
//!
//! # Memory
//!
//! | Qubits | Amplitudes |
//! |--------|------------|
//! | 10 | ~16 KB |
//! | 20 | ~16 MB |
//! | 24 | ~256 MB |
//!
//! # Example
//!
//! ```ignore
//! use dqpu_adapter_sim::StatevectorSampler;
//! use dqpu_hal::Sampler;
//! use dqpu_ir::Circuit;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let sampler = StatevectorSampler::new();
//!     let result = sampler.sample(&Circuit::bell()?, 1000).await?;
//!     // Expect ~50% "00" and ~50% "11"
//!     println!("{:?}", result);
//!     Ok(())
//! }
//! ```

mod sampler;
mod statevector;

pub use sampler::{DEFAULT_MAX_QUBITS, STATEVECTOR, StatevectorSampler, register};
pub use statevector::Statevector;
