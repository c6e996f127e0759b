//! The `basic` trapping strategy.
//!
//! Each round inserts a fresh qubit at a random index. With probability 1/2
//! an `X` is applied to it at a random point in the gate sequence; otherwise
//! it is left alone. Either way the qubit must read back deterministically,
//! so its measured bias is 1 and its majority outcome is known.

use rand::{Rng, RngCore};
use tracing::{debug, warn};

use dqpu_hal::ExperimentResult;
use dqpu_ir::{Circuit, GateId, Operation, QubitId};

use crate::error::{TrapError, TrapResult};
use crate::info::TrapInfo;
use crate::trapper::{Trapped, Trapper, remap_qubit};

/// Method tag of [`BasicTrapper`].
pub const BASIC_METHOD: &str = "basic";

/// Allowed distance between observed and expected bias.
pub const BIAS_TOLERANCE: f64 = 0.05;

/// Deterministic-outcome traps with an optional bit flip.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicTrapper;

impl BasicTrapper {
    /// Create the strategy.
    pub fn new() -> Self {
        Self
    }
}

impl Trapper for BasicTrapper {
    fn method(&self) -> &'static str {
        BASIC_METHOD
    }

    fn trap(&self, circuit: &Circuit, level: u32, rng: &mut dyn RngCore) -> TrapResult<Trapped> {
        if !circuit.has_terminal_measurements() {
            return Err(TrapError::MidCircuitMeasurement);
        }

        let mut num_qubits = circuit.num_qubits();
        let mut gates: Vec<Operation> = circuit.gates().cloned().collect();
        let mut traps: Vec<TrapInfo> = Vec::with_capacity(level as usize);

        for _ in 0..level {
            let at = rng.gen_range(0..=num_qubits);
            num_qubits += 1;

            gates = gates.iter().map(|op| op.remapped(|q| remap_qubit(q, at))).collect();
            for trap in &mut traps {
                trap.qubit = remap_qubit(trap.qubit, at);
            }

            let value_expected = rng.gen_bool(0.5);
            if value_expected {
                let position = rng.gen_range(0..=gates.len());
                gates.insert(position, Operation::gate(GateId::X, [QubitId(at)]));
            }
            debug!(qubit = at, value_expected, "Inserted trap");
            traps.push(TrapInfo::new(BASIC_METHOD, at, value_expected, 1.0));
        }

        let mut trapped = Circuit::from_operations(num_qubits, num_qubits, gates)?;
        trapped.measure_all()?;

        Ok(Trapped {
            circuit: trapped,
            traps,
        })
    }

    fn verify(&self, traps: &[TrapInfo], results: &ExperimentResult) -> bool {
        if results
            .iter()
            .any(|(key, _)| !key.bytes().all(|b| b == b'0' || b == b'1'))
        {
            warn!("Result keys contain characters other than 0 and 1");
            return false;
        }

        traps.iter().all(|trap| verify_trap(trap, results))
    }
}

#[allow(clippy::cast_precision_loss)]
fn verify_trap(trap: &TrapInfo, results: &ExperimentResult) -> bool {
    if trap.method != BASIC_METHOD {
        warn!(method = %trap.method, "Cannot verify trap of foreign method");
        return false;
    }

    let position = trap.qubit as usize;
    let (mut zeros, mut ones) = (0_u128, 0_u128);
    for (key, count) in results.iter() {
        let Some(bit) = key.as_bytes().iter().rev().nth(position) else {
            warn!(qubit = trap.qubit, key, "Result key too short for trap");
            return false;
        };
        if *bit == b'1' {
            ones += u128::from(count);
        } else {
            zeros += u128::from(count);
        }
    }

    let total = zeros + ones;
    if total == 0 {
        debug!(qubit = trap.qubit, "No shots at trap position");
        return false;
    }

    let observed = ones.abs_diff(zeros) as f64 / total as f64;
    if observed < trap.probability - BIAS_TOLERANCE || observed > trap.probability + BIAS_TOLERANCE {
        debug!(qubit = trap.qubit, observed, expected = trap.probability, "Trap bias out of tolerance");
        return false;
    }

    let majority = ones > zeros;
    if majority != trap.value_expected {
        debug!(qubit = trap.qubit, majority, "Trap majority outcome mismatch");
        return false;
    }

    true
}
