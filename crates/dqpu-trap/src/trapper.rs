//! The trapper interface and the helpers every strategy shares.

use rand::RngCore;

use dqpu_hal::ExperimentResult;
use dqpu_ir::Circuit;

use crate::error::TrapResult;
use crate::info::TrapInfo;

/// A circuit with trap qubits inserted, and the record of those traps.
#[derive(Debug, Clone, PartialEq)]
pub struct Trapped {
    /// The augmented circuit handed to samplers.
    pub circuit: Circuit,
    /// Traps in insertion order; qubit indices refer to `circuit`.
    pub traps: Vec<TrapInfo>,
}

/// A trap insertion and verification strategy.
pub trait Trapper: Send + Sync {
    /// Method tag written into every [`TrapInfo`] this strategy produces.
    fn method(&self) -> &'static str;

    /// Insert `level` traps into `circuit`.
    fn trap(&self, circuit: &Circuit, level: u32, rng: &mut dyn RngCore) -> TrapResult<Trapped>;

    /// Check measured counts of a trapped circuit against its traps.
    fn verify(&self, traps: &[TrapInfo], results: &ExperimentResult) -> bool;

    /// Strip trap bits from every bitstring, merging counts of keys that
    /// become equal.
    fn untrap_results(&self, traps: &[TrapInfo], results: &ExperimentResult) -> ExperimentResult {
        untrap_results(traps, results)
    }
}

/// Shift an operand index past an inserted qubit: indices at or above the
/// insertion point move up by one.
pub fn remap_qubit(index: u32, insertion_point: u32) -> u32 {
    if index >= insertion_point {
        index + 1
    } else {
        index
    }
}

/// Remove trap positions from every key of `results`.
///
/// Keys are most-significant-bit first, so qubit `i` is character
/// `len - 1 - i`. Positions are removed in descending qubit order so that
/// lower indices stay valid.
pub fn untrap_results(traps: &[TrapInfo], results: &ExperimentResult) -> ExperimentResult {
    let mut positions: Vec<usize> = traps.iter().map(|t| t.qubit as usize).collect();
    positions.sort_unstable_by(|a, b| b.cmp(a));
    positions.dedup();

    results
        .iter()
        .map(|(key, count)| {
            let mut bits: Vec<char> = key.chars().rev().collect();
            for &p in &positions {
                if p < bits.len() {
                    bits.remove(p);
                }
            }
            (bits.into_iter().rev().collect::<String>(), count)
        })
        .collect()
}
