//! Untrap command implementation.

use std::path::Path;

use anyhow::Result;

use dqpu_hal::ExperimentResult;
use dqpu_trap::trapper_for;

use super::common::{load_result, load_trap_file, print_counts, write_output};

/// Strip trap bits from a result file.
pub fn untrap_file(traps: &Path, results: &Path, method: &str) -> Result<ExperimentResult> {
    let traps = load_trap_file(traps)?;
    let counts = load_result(results)?;
    Ok(trapper_for(method)?.untrap_results(&traps, &counts))
}

/// Execute the untrap command.
pub fn execute(traps: &Path, results: &Path, output: Option<&Path>, method: &str) -> Result<()> {
    let untrapped = untrap_file(traps, results, method)?;
    if output.is_some() {
        print_counts(&untrapped);
    }
    write_output(output, &untrapped.to_json()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untrap_file() {
        let dir = tempfile::tempdir().unwrap();
        let traps = dir.path().join("traps.json");
        std::fs::write(
            &traps,
            r#"[{"method": "basic", "qubit": 1, "value_expected": true, "probability": 1.0}]"#,
        )
        .unwrap();
        let results = dir.path().join("counts.json");
        std::fs::write(&results, r#"{"010": 300, "111": 700}"#).unwrap();

        let untrapped = untrap_file(&traps, &results, "basic").unwrap();
        assert_eq!(untrapped.get("00"), 300);
        assert_eq!(untrapped.get("11"), 700);

        let out = dir.path().join("untrapped.json");
        execute(&traps, &results, Some(&out), "basic").unwrap();
        assert_eq!(load_result(&out).unwrap(), untrapped);
    }
}
