//! Shared helpers for CLI commands.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use dqpu_hal::{ExperimentResult, SamplerRegistry};
use dqpu_ir::Circuit;
use dqpu_trap::TrapInfo;

/// Load a circuit from an OpenQASM 2 file.
pub fn load_circuit(path: &Path) -> Result<Circuit> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    dqpu_qasm::parse(&source).map_err(|e| anyhow::anyhow!("Parse error: {e}"))
}

/// Load measurement counts from a JSON file.
pub fn load_result(path: &Path) -> Result<ExperimentResult> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    ExperimentResult::from_json(&bytes)
        .with_context(|| format!("Invalid result file: {}", path.display()))
}

/// Load trap metadata from a JSON file.
pub fn load_trap_file(path: &Path) -> Result<Vec<TrapInfo>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    dqpu_trap::load_traps(&bytes).with_context(|| format!("Invalid trap file: {}", path.display()))
}

/// Write `contents` to `path`, or to stdout when no path is given.
pub fn write_output(path: Option<&Path>, contents: &str) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, contents)
            .with_context(|| format!("Failed to write file: {}", path.display())),
        None => {
            println!("{contents}");
            Ok(())
        }
    }
}

/// Registry with every sampler compiled into the binary.
pub fn sampler_registry() -> SamplerRegistry {
    let mut registry = SamplerRegistry::new();
    dqpu_adapter_sim::register(&mut registry);
    registry
}

/// Print counts as a bar table, most frequent first.
pub fn print_counts(result: &ExperimentResult) {
    let mut sorted: Vec<_> = result.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    let total = result.total().max(1) as f64;

    for (bitstring, count) in sorted.iter().take(16) {
        let prob = *count as f64 / total * 100.0;
        let bar: String = "█".repeat((prob / 2.0).round() as usize);
        println!(
            "  {}: {:>6} ({:>5.2}%) {}",
            style(bitstring).cyan(),
            count,
            prob,
            style(bar).green()
        );
    }

    if sorted.len() > 16 {
        println!("  ... and {} more outcomes", sorted.len() - 16);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_circuit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bell.qasm");
        std::fs::write(&path, dqpu_qasm::serialize(&Circuit::bell().unwrap())).unwrap();
        assert_eq!(load_circuit(&path).unwrap(), Circuit::bell().unwrap());

        assert!(load_circuit(&dir.path().join("missing.qasm")).is_err());

        let bad = dir.path().join("bad.qasm");
        std::fs::write(&bad, "OPENQASM 3.0;").unwrap();
        let err = load_circuit(&bad).unwrap_err();
        assert!(err.to_string().starts_with("Parse error"));
    }

    #[test]
    fn test_load_result_and_traps() {
        let dir = tempfile::tempdir().unwrap();
        let counts = dir.path().join("counts.json");
        std::fs::write(&counts, r#"{"00": 3, "11": 5}"#).unwrap();
        assert_eq!(load_result(&counts).unwrap().total(), 8);

        let traps = dir.path().join("traps.json");
        std::fs::write(&traps, "[]").unwrap();
        assert!(load_trap_file(&traps).unwrap().is_empty());
        std::fs::write(&traps, "{}").unwrap();
        assert!(load_trap_file(&traps).is_err());
    }

    #[test]
    fn test_registry_has_statevector() {
        assert!(sampler_registry().has_sampler(dqpu_adapter_sim::STATEVECTOR));
    }
}
