//! The sampler capability.
//!
//! A sampler executes a circuit a number of times and reports the measured
//! bitstrings. Nodes only see this trait; concrete samplers live in adapter
//! crates and are looked up by name through the
//! [`SamplerRegistry`](crate::registry::SamplerRegistry).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use dqpu_ir::Circuit;

use crate::error::HalResult;
use crate::result::ExperimentResult;

/// Shots used by the default self-test.
pub const SELF_TEST_SHOTS: u64 = 1024;

/// Configuration passed to sampler factories.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Registry name of the sampler.
    pub name: String,
    /// RNG seed for reproducible sampling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Sampler-specific settings.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SamplerConfig {
    /// Create a configuration for the named sampler.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Fix the RNG seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Something that can sample measurement outcomes of a circuit.
#[async_trait]
pub trait Sampler: Send + Sync {
    /// Registry name.
    fn name(&self) -> &str;

    /// Largest circuit, in qubits, the sampler accepts.
    fn max_qubits(&self) -> u32;

    /// Run `circuit` for `shots` shots.
    async fn sample(&self, circuit: &Circuit, shots: u64) -> HalResult<ExperimentResult>;

    /// Sample a Bell pair and check that only correlated outcomes come back
    /// and that every shot is accounted for.
    async fn self_test(&self) -> bool {
        let circuit = match Circuit::bell() {
            Ok(c) => c,
            Err(e) => {
                warn!(sampler = self.name(), "Self-test circuit failed to build: {e}");
                return false;
            }
        };
        match self.sample(&circuit, SELF_TEST_SHOTS).await {
            Ok(result) => {
                let correlated = result.get("00") + result.get("11");
                let ok = result.total() == SELF_TEST_SHOTS && correlated == SELF_TEST_SHOTS;
                if !ok {
                    warn!(sampler = self.name(), ?result, "Self-test produced unexpected counts");
                }
                ok
            }
            Err(e) => {
                warn!(sampler = self.name(), "Self-test sampling failed: {e}");
                false
            }
        }
    }
}
