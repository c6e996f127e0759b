//! Verify command implementation.

use std::path::Path;

use anyhow::Result;
use console::style;

use dqpu_trap::trapper_for;

use super::common::{load_result, load_trap_file};

/// Why a result was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    ShotMismatch { expected: u64, got: u64 },
    TrapsFailed,
}

/// Check a result file against a trap file.
pub fn check(traps: &Path, results: &Path, method: &str, shots: Option<u64>) -> Result<Verdict> {
    let traps = load_trap_file(traps)?;
    let counts = load_result(results)?;

    if let Some(expected) = shots {
        if counts.checked_total() != Some(expected) {
            return Ok(Verdict::ShotMismatch {
                expected,
                got: counts.total(),
            });
        }
    }

    let trapper = trapper_for(method)?;
    if trapper.verify(&traps, &counts) {
        Ok(Verdict::Valid)
    } else {
        Ok(Verdict::TrapsFailed)
    }
}

/// Execute the verify command. An invalid result is reported as an error so
/// the exit status reflects the verdict.
pub fn execute(traps: &Path, results: &Path, method: &str, shots: Option<u64>) -> Result<()> {
    match check(traps, results, method, shots)? {
        Verdict::Valid => {
            println!("{} Result is valid", style("✓").green().bold());
            Ok(())
        }
        Verdict::ShotMismatch { expected, got } => {
            anyhow::bail!("Shot count mismatch: expected {expected}, got {got}")
        }
        Verdict::TrapsFailed => anyhow::bail!("Trap check failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(dir: &Path, counts: &str) -> (std::path::PathBuf, std::path::PathBuf) {
        let traps = dir.join("traps.json");
        std::fs::write(
            &traps,
            r#"[{"method": "basic", "qubit": 0, "value_expected": true, "probability": 1.0}]"#,
        )
        .unwrap();
        let results = dir.join("counts.json");
        std::fs::write(&results, counts).unwrap();
        (traps, results)
    }

    #[test]
    fn test_valid_result() {
        let dir = tempfile::tempdir().unwrap();
        let (traps, results) = files(dir.path(), r#"{"1": 1000, "0": 0}"#);
        assert_eq!(check(&traps, &results, "basic", Some(1000)).unwrap(), Verdict::Valid);
        assert!(execute(&traps, &results, "basic", None).is_ok());
    }

    #[test]
    fn test_biased_trap_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (traps, results) = files(dir.path(), r#"{"1": 500, "0": 500}"#);
        assert_eq!(
            check(&traps, &results, "basic", None).unwrap(),
            Verdict::TrapsFailed
        );
        assert!(execute(&traps, &results, "basic", None).is_err());
    }

    #[test]
    fn test_shot_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let (traps, results) = files(dir.path(), r#"{"1": 900}"#);
        assert_eq!(
            check(&traps, &results, "basic", Some(1000)).unwrap(),
            Verdict::ShotMismatch {
                expected: 1000,
                got: 900
            }
        );
    }
}
