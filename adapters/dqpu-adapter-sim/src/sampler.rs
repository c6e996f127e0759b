//! Statevector sampler.

use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, instrument};

use dqpu_hal::{ExperimentResult, HalError, HalResult, Sampler, SamplerConfig, SamplerRegistry};
use dqpu_ir::{Circuit, Operation};

use crate::statevector::Statevector;

/// Registry name of the statevector sampler.
pub const STATEVECTOR: &str = "statevector";

/// Default qubit limit.
pub const DEFAULT_MAX_QUBITS: u32 = 24;

/// Exact statevector simulation with sampled terminal measurements.
pub struct StatevectorSampler {
    max_qubits: u32,
    rng: Mutex<StdRng>,
}

impl StatevectorSampler {
    /// Create a sampler seeded from entropy.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Create a sampler with a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            max_qubits: DEFAULT_MAX_QUBITS,
            rng: Mutex::new(rng),
        }
    }

    /// Override the qubit limit.
    #[must_use]
    pub fn with_max_qubits(mut self, max_qubits: u32) -> Self {
        self.max_qubits = max_qubits;
        self
    }

    /// Build from registry configuration. `max_qubits` may be given as an
    /// extra field.
    pub fn from_config(config: &SamplerConfig) -> HalResult<Self> {
        let sampler = match config.seed {
            Some(seed) => Self::seeded(seed),
            None => Self::new(),
        };
        match config.extra.get("max_qubits") {
            None => Ok(sampler),
            Some(value) => value
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .map(|max| sampler.with_max_qubits(max))
                .ok_or_else(|| {
                    HalError::Configuration(format!("invalid max_qubits: {value}"))
                }),
        }
    }

    #[instrument(skip(self, circuit), fields(qubits = circuit.num_qubits()))]
    fn run(&self, circuit: &Circuit, shots: u64) -> HalResult<ExperimentResult> {
        if circuit.num_qubits() > self.max_qubits {
            return Err(HalError::CircuitTooLarge(format!(
                "Circuit has {} qubits but sampler only supports {}",
                circuit.num_qubits(),
                self.max_qubits
            )));
        }
        if !circuit.has_terminal_measurements() {
            return Err(HalError::InvalidCircuit(
                "mid-circuit measurement is not supported".into(),
            ));
        }

        let start = Instant::now();
        let mut sv = Statevector::new(circuit.num_qubits() as usize);
        for op in circuit.gates() {
            sv.apply(op)?;
        }

        let outcomes = {
            let mut rng = self
                .rng
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            sv.sample(shots, &mut *rng)?
        };

        let readout = Readout::new(circuit);
        let mut counts = ExperimentResult::new();
        for outcome in outcomes {
            counts.insert(readout.bitstring(outcome), 1);
        }

        debug!(
            distinct = counts.len(),
            "Sampling completed in {:?}",
            start.elapsed()
        );
        Ok(counts)
    }
}

impl Default for StatevectorSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sampler for StatevectorSampler {
    fn name(&self) -> &str {
        STATEVECTOR
    }

    fn max_qubits(&self) -> u32 {
        self.max_qubits
    }

    async fn sample(&self, circuit: &Circuit, shots: u64) -> HalResult<ExperimentResult> {
        self.run(circuit, shots)
    }
}

/// Maps a sampled basis state to a classical-register bitstring.
struct Readout {
    /// `(qubit, clbit)` pairs; later measurements of a bit win.
    wiring: Vec<(usize, usize)>,
    width: usize,
}

impl Readout {
    fn new(circuit: &Circuit) -> Self {
        let wiring: Vec<(usize, usize)> = circuit
            .measurements()
            .filter_map(|op| match op {
                Operation::Measure { qubit, clbit } => Some((qubit.index(), clbit.index())),
                Operation::Gate { .. } => None,
            })
            .collect();

        if wiring.is_empty() {
            // Unmeasured circuits read out every qubit.
            let n = circuit.num_qubits() as usize;
            return Self {
                wiring: (0..n).map(|q| (q, q)).collect(),
                width: n,
            };
        }
        Self {
            wiring,
            width: circuit.num_clbits() as usize,
        }
    }

    fn bitstring(&self, outcome: usize) -> String {
        let mut bits = vec!['0'; self.width];
        for &(qubit, clbit) in &self.wiring {
            bits[clbit] = if (outcome >> qubit) & 1 == 1 { '1' } else { '0' };
        }
        bits.iter().rev().collect()
    }
}

/// Register the statevector sampler under [`STATEVECTOR`].
pub fn register(registry: &mut SamplerRegistry) {
    registry.register_factory(STATEVECTOR, |config| {
        Ok(Box::new(StatevectorSampler::from_config(&config)?) as Box<dyn Sampler>)
    });
}
