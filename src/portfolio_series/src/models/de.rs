//! Serde helpers for the backend's loosely-typed numeric fields.
//!
//! The brokerage API encodes most decimals as JSON strings (`"12.50"`), but a
//! few endpoints send plain numbers. Both are accepted here.

use serde::{Deserialize, Deserializer, de::Error as _};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrStr {
    Num(f64),
    Str(String),
}

impl NumOrStr {
    fn into_f64(self) -> Option<f64> {
        match self {
            NumOrStr::Num(n) => Some(n),
            NumOrStr::Str(s) => s.trim().parse::<f64>().ok(),
        }
        .filter(|n| n.is_finite())
    }
}

/// Decimal that may arrive as a number or a numeric string.
pub fn f64_lenient<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    NumOrStr::deserialize(deserializer)?
        .into_f64()
        .ok_or_else(|| D::Error::custom("expected a finite number or numeric string"))
}

/// Optional decimal; `null`, absent, or unparsable values become `None`.
pub fn opt_f64_lenient<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<NumOrStr>::deserialize(deserializer)?.and_then(NumOrStr::into_f64))
}
