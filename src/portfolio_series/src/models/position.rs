use serde::{Deserialize, Serialize};

use crate::models::de;
use crate::series::timestamp::{RawTimestamp, normalize};

/// Direction of a held position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

/// A held instrument as reported by the positions endpoint.
///
/// Fetched fresh for every load cycle; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPosition")]
pub struct Position {
    pub symbol: String,
    /// Quantity as reported; negative for shorts on some account types.
    pub qty: f64,
    pub market_value: f64,
    pub current_price: f64,
    /// Entry fill time in Unix seconds, if known.
    pub filled_at: Option<i64>,
    pub side: Side,
}

impl Position {
    /// Unsigned share count.
    pub fn quantity(&self) -> f64 {
        self.qty.abs()
    }

    pub fn is_short(&self) -> bool {
        self.side == Side::Short
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPosition {
    symbol: String,
    #[serde(default, deserialize_with = "de::opt_f64_lenient")]
    qty: Option<f64>,
    #[serde(default, alias = "market_value", deserialize_with = "de::opt_f64_lenient")]
    market_value: Option<f64>,
    #[serde(default, alias = "current_price", deserialize_with = "de::opt_f64_lenient")]
    current_price: Option<f64>,
    #[serde(default, alias = "filled_at")]
    filled_at: Option<RawTimestamp>,
    #[serde(default)]
    side: Option<String>,
}

impl From<RawPosition> for Position {
    fn from(raw: RawPosition) -> Self {
        let qty = raw.qty.unwrap_or(0.0);
        let side = match raw.side.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("short") => Side::Short,
            Some("long") => Side::Long,
            _ if qty < 0.0 => Side::Short,
            _ => Side::Long,
        };
        Position {
            symbol: raw.symbol,
            qty,
            market_value: raw.market_value.unwrap_or(0.0),
            current_price: raw.current_price.unwrap_or(0.0),
            filled_at: raw.filled_at.as_ref().and_then(normalize),
            side,
        }
    }
}
