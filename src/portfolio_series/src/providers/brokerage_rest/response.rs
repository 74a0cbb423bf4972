use serde::Deserialize;

use crate::models::{
    account::Order,
    bar::{InstrumentMeta, RawBar},
    position::Position,
};

/// History endpoint body: `{ bars, meta }`, or a bare bar array.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum HistoryResponse {
    Wrapped {
        #[serde(default)]
        bars: Vec<RawBar>,
        #[serde(default)]
        meta: Option<InstrumentMeta>,
    },
    Bare(Vec<RawBar>),
}

impl HistoryResponse {
    pub fn into_parts(self) -> (Vec<RawBar>, Option<InstrumentMeta>) {
        match self {
            HistoryResponse::Wrapped { bars, meta } => (bars, meta),
            HistoryResponse::Bare(bars) => (bars, None),
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum PositionsResponse {
    List(Vec<Position>),
    Wrapped { positions: Vec<Position> },
}

impl PositionsResponse {
    pub fn into_positions(self) -> Vec<Position> {
        match self {
            PositionsResponse::List(p) | PositionsResponse::Wrapped { positions: p } => p,
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum OrdersResponse {
    List(Vec<Order>),
    Wrapped { orders: Vec<Order> },
}

impl OrdersResponse {
    pub fn into_orders(self) -> Vec<Order> {
        match self {
            OrdersResponse::List(o) | OrdersResponse::Wrapped { orders: o } => o,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct KycTokenResponse {
    pub token: String,
}

/// Error body shapes the backend uses on non-2xx responses.
#[derive(Deserialize, Debug, Default)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

/// Best human-readable message from an error body; falls back to the raw text.
pub fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<ErrorBody>(body).unwrap_or_default();
    parsed
        .details
        .or(parsed.message)
        .or(parsed.error)
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "Unknown API error".to_string()
            } else {
                trimmed.to_string()
            }
        })
}
