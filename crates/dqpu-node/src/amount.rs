//! Token amounts.
//!
//! The ledger counts in integer subunits, 10^24 per unit, and emits them as
//! decimal strings because they overflow JSON numbers.

/// Subunits per whole unit.
pub const SUBUNITS_PER_UNIT: u128 = 1_000_000_000_000_000_000_000_000;

/// Convert a unit amount to subunits. Negative and non-finite inputs
/// saturate to zero.
pub fn to_subunits(value: f64) -> u128 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    (value * SUBUNITS_PER_UNIT as f64) as u128
}

/// Convert subunits to a unit amount.
pub fn from_subunits(value: u128) -> f64 {
    value as f64 / SUBUNITS_PER_UNIT as f64
}

/// Serde adapter writing `u128` as a decimal string and reading either a
/// string or a plain integer.
pub mod as_string {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Number(u64),
    }

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
            Repr::Number(n) => Ok(u128::from(n)),
        }
    }
}
