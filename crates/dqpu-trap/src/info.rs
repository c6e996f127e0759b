//! Trap metadata.

use serde::{Deserialize, Serialize};

use crate::error::TrapResult;

/// One inserted trap qubit and the statistics it must show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrapInfo {
    /// Strategy tag, e.g. `"basic"`.
    pub method: String,
    /// Index of the trap qubit in the trapped circuit.
    pub qubit: u32,
    /// Majority outcome the trap must show.
    pub value_expected: bool,
    /// Expected bias `|c1 - c0| / (c1 + c0)`, in `[0, 1]`.
    pub probability: f64,
}

impl TrapInfo {
    /// Create a trap record.
    pub fn new(method: impl Into<String>, qubit: u32, value_expected: bool, probability: f64) -> Self {
        Self {
            method: method.into(),
            qubit,
            value_expected,
            probability,
        }
    }
}

/// Encode traps as the JSON array stored in trap files.
pub fn dump_traps(traps: &[TrapInfo]) -> TrapResult<String> {
    Ok(serde_json::to_string(traps)?)
}

/// Decode a trap file.
pub fn load_traps(bytes: &[u8]) -> TrapResult<Vec<TrapInfo>> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trap_file_shape() {
        let traps = vec![TrapInfo::new("basic", 2, true, 1.0)];
        let json = dump_traps(&traps).unwrap();
        assert_eq!(
            json,
            r#"[{"method":"basic","qubit":2,"value_expected":true,"probability":1.0}]"#
        );
        assert_eq!(load_traps(json.as_bytes()).unwrap(), traps);
    }

    #[test]
    fn test_load_rejects_garbage() {
        assert!(load_traps(b"{\"method\": \"basic\"}").is_err());
    }
}
