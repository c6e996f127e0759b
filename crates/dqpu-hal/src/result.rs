//! Measurement results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::HalResult;

/// Measurement counts keyed by bitstring.
///
/// Bitstrings carry one character per classical bit, most significant first:
/// classical bit 0 is the last character. Serialized as a plain JSON object
/// (`{"00": 500, "11": 500}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExperimentResult(BTreeMap<String, u64>);

impl ExperimentResult {
    /// Create an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` to the entry for `bitstring`.
    pub fn insert(&mut self, bitstring: impl Into<String>, count: u64) {
        let entry = self.0.entry(bitstring.into()).or_insert(0);
        *entry = entry.saturating_add(count);
    }

    /// Count recorded for a bitstring, zero if absent.
    pub fn get(&self, bitstring: &str) -> u64 {
        self.0.get(bitstring).copied().unwrap_or(0)
    }

    /// Sum of all counts, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        self.0.values().fold(0, |acc, &count| acc.saturating_add(count))
    }

    /// Sum of all counts, or `None` if it does not fit in a `u64`.
    pub fn checked_total(&self) -> Option<u64> {
        self.0
            .values()
            .try_fold(0_u64, |acc, &count| acc.checked_add(count))
    }

    /// Number of distinct bitstrings.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no outcome was recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(bitstring, count)` in bitstring order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// The outcome with the highest count.
    pub fn most_frequent(&self) -> Option<(&str, u64)> {
        self.iter().max_by_key(|&(_, count)| count)
    }

    /// Decode from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> HalResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Encode as JSON.
    pub fn to_json(&self) -> HalResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for ExperimentResult {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut result = Self::new();
        for (bitstring, count) in iter {
            result.insert(bitstring, count);
        }
        result
    }
}

impl<'a> IntoIterator for &'a ExperimentResult {
    type Item = (&'a String, &'a u64);
    type IntoIter = std::collections::btree_map::Iter<'a, String, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
