//! Trap command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use rand::SeedableRng;
use rand::rngs::StdRng;

use dqpu_trap::{Trapped, dump_traps, trapper_for};

use super::common::{load_circuit, write_output};

/// Trap a circuit, returning the augmented circuit and its traps.
pub fn trap_file(input: &Path, method: &str, level: u32, seed: Option<u64>) -> Result<Trapped> {
    let circuit = load_circuit(input)?;
    let trapper = trapper_for(method)?;
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    trapper
        .trap(&circuit, level, &mut rng)
        .with_context(|| format!("Failed to trap {}", input.display()))
}

/// Execute the trap command.
pub fn execute(
    input: &Path,
    output: Option<&Path>,
    traps: &Path,
    method: &str,
    level: u32,
    seed: Option<u64>,
) -> Result<()> {
    let trapped = trap_file(input, method, level, seed)?;

    std::fs::write(traps, dump_traps(&trapped.traps)?)
        .with_context(|| format!("Failed to write file: {}", traps.display()))?;
    write_output(output, &dqpu_qasm::serialize(&trapped.circuit))?;

    if output.is_some() {
        eprintln!(
            "{} Trapped {} with {} trap(s): {} qubits",
            style("✓").green().bold(),
            style(input.display()).green(),
            trapped.traps.len(),
            trapped.circuit.num_qubits()
        );
        eprintln!("  Traps written to {}", style(traps.display()).cyan());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trap_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bell.qasm");
        std::fs::write(
            &input,
            "OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg q[2];\ncreg c[2];\nh q[0];\ncx q[0], q[1];\nmeasure q -> c;",
        )
        .unwrap();
        let output = dir.path().join("trapped.qasm");
        let traps = dir.path().join("traps.json");

        execute(&input, Some(&output), &traps, "basic", 2, Some(1)).unwrap();

        let trapped = load_circuit(&output).unwrap();
        assert_eq!(trapped.num_qubits(), 4);
        let traps = super::super::common::load_trap_file(&traps).unwrap();
        assert_eq!(traps.len(), 2);
    }

    #[test]
    fn test_unknown_method() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bell.qasm");
        std::fs::write(&input, dqpu_qasm::serialize(&dqpu_ir::Circuit::bell().unwrap())).unwrap();
        assert!(trap_file(&input, "fancy", 1, None).is_err());
    }
}
