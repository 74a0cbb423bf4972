//! Account-level payloads: summary, orders, quotes.

use serde::{Deserialize, Serialize};

use crate::models::de;
use crate::series::timestamp::{RawTimestamp, normalize};

/// Account summary; `cash_balance` is the authoritative anchor for the
/// reconstructed cash curve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    #[serde(default, alias = "cash", deserialize_with = "de::opt_f64_lenient")]
    pub cash_balance: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_lenient")]
    pub portfolio_value: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_lenient")]
    pub buying_power: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_lenient")]
    pub equity: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
}

impl AccountSummary {
    /// Cash balance, zero when the backend omits it.
    pub fn cash(&self) -> f64 {
        self.cash_balance.unwrap_or(0.0)
    }
}

/// Order status filter for the orders endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusFilter {
    #[default]
    Open,
    Closed,
    All,
}

impl OrderStatusFilter {
    pub const fn as_str(self) -> &'static str {
        match self {
            OrderStatusFilter::Open => "open",
            OrderStatusFilter::Closed => "closed",
            OrderStatusFilter::All => "all",
        }
    }
}

/// Query parameters for listing orders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrdersQuery {
    pub status: OrderStatusFilter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl OrdersQuery {
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("status".to_string(), self.status.as_str().to_string())];
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }
}

/// An order as listed by the orders endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(default)]
    pub id: Option<String>,
    pub symbol: String,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default, deserialize_with = "de::opt_f64_lenient")]
    pub qty: Option<f64>,
    #[serde(default, alias = "filled_qty", deserialize_with = "de::opt_f64_lenient")]
    pub filled_qty: Option<f64>,
    #[serde(default, alias = "filled_avg_price", deserialize_with = "de::opt_f64_lenient")]
    pub filled_avg_price: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "filled_at")]
    pub filled_at: Option<RawTimestamp>,
}

impl Order {
    /// Fill time in Unix seconds.
    pub fn filled_at_secs(&self) -> Option<i64> {
        self.filled_at.as_ref().and_then(normalize)
    }
}

/// Latest quote for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    #[serde(default, deserialize_with = "de::opt_f64_lenient")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_lenient")]
    pub change: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_lenient")]
    pub change_percent: Option<f64>,
}
