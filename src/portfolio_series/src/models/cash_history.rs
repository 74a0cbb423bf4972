//! Running cash balance over time.

use serde::{Deserialize, Serialize};

use crate::models::activity::RawActivity;
use crate::series::ledger::CURRENT_BALANCE_KIND;
use crate::series::timestamp::RawTimestamp;

/// One point on the reconstructed cash curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashHistoryPoint {
    /// Unix seconds.
    pub timestamp: i64,
    /// Running balance after this event.
    #[serde(alias = "value")]
    pub balance: f64,
    /// Signed cash change contributed by this event.
    #[serde(alias = "change")]
    pub delta: f64,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub symbol: Option<String>,
}

/// Summary statistics over a cash history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashSummary {
    pub current: f64,
    pub min: f64,
    pub max: f64,
    pub start: f64,
    pub change: f64,
    pub change_percent: f64,
    pub count: usize,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// A full cash history: ordered points plus their summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashHistory {
    pub points: Vec<CashHistoryPoint>,
    pub summary: CashSummary,
}

impl CashHistory {
    /// `(timestamp, balance)` pairs for alignment.
    pub fn series(&self) -> Vec<(i64, f64)> {
        self.points.iter().map(|p| (p.timestamp, p.balance)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// True when at least one point is a real ledger entry rather than the
    /// current-balance anchor.
    pub fn has_entries(&self) -> bool {
        self.points.iter().any(|p| p.kind != CURRENT_BALANCE_KIND)
    }
}

/// Event marker inside a pre-computed history payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PrecomputedEvent {
    pub timestamp: RawTimestamp,
    pub value: f64,
    pub change: f64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub symbol: Option<String>,
}

/// The backend's pre-computed cash history object.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrecomputedCashHistory {
    /// Seconds, milliseconds or ISO-8601 strings; normalized on ingest.
    pub timestamps: Vec<RawTimestamp>,
    pub values: Vec<f64>,
    #[serde(default)]
    pub events: Vec<PrecomputedEvent>,
    #[serde(default)]
    pub current: Option<f64>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// Envelope some account modes use for raw activities.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityEnvelope {
    pub activities: Vec<RawActivity>,
}

/// What the cash-history endpoint may return, depending on account mode.
///
/// Resolved once by serde; [`crate::series::ledger::from_payload`] normalizes
/// every variant into a [`CashHistory`].
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CashHistoryPayload {
    Precomputed(PrecomputedCashHistory),
    Activities(Vec<RawActivity>),
    Envelope(ActivityEnvelope),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_variant_selection() {
        let pre: CashHistoryPayload = serde_json::from_str(
            r#"{"timestamps":[1,2],"values":[10,20],"events":[],"current":20,"min":10,"max":20}"#,
        )
        .unwrap();
        assert!(matches!(pre, CashHistoryPayload::Precomputed(_)));

        let list: CashHistoryPayload =
            serde_json::from_str(r#"[{"activity_type":"CSD","date":"2024-01-01","net_amount":"100"}]"#)
                .unwrap();
        assert!(matches!(list, CashHistoryPayload::Activities(ref v) if v.len() == 1));

        let env: CashHistoryPayload =
            serde_json::from_str(r#"{"activities":[]}"#).unwrap();
        assert!(matches!(env, CashHistoryPayload::Envelope(_)));
    }

    #[test]
    fn precomputed_accepts_mixed_timestamp_encodings() {
        let pre: CashHistoryPayload = serde_json::from_str(
            r#"{"timestamps":[1700000000000,"2024-01-01T00:00:00Z"],"values":[1,2],
                "events":[{"timestamp":"2024-01-01","value":2,"change":1,"type":"deposit"}]}"#,
        )
        .unwrap();
        let CashHistoryPayload::Precomputed(pre) = pre else {
            panic!("expected precomputed payload");
        };
        assert_eq!(pre.timestamps[0], RawTimestamp::Number(1_700_000_000_000.0));
        assert_eq!(pre.events[0].timestamp, RawTimestamp::from("2024-01-01"));
    }

    #[test]
    fn anchor_alone_is_not_an_entry() {
        let anchor = CashHistoryPoint {
            timestamp: 10,
            balance: 1000.0,
            delta: 1000.0,
            label: "Current balance".into(),
            kind: CURRENT_BALANCE_KIND.into(),
            symbol: None,
        };
        let mut history = CashHistory {
            points: vec![anchor.clone()],
            summary: crate::series::ledger::summarize(&[anchor]),
        };
        assert!(!history.is_empty());
        assert!(!history.has_entries());
        history.points.insert(
            0,
            CashHistoryPoint {
                timestamp: 5,
                balance: 10.0,
                delta: 10.0,
                label: "Deposit".into(),
                kind: "deposit".into(),
                symbol: None,
            },
        );
        assert!(history.has_entries());
    }

    #[test]
    fn point_accepts_precomputed_field_names() {
        let p: CashHistoryPoint = serde_json::from_str(
            r#"{"timestamp":5,"value":1.5,"change":0.5,"label":"Dividend","type":"dividend","symbol":"MSFT"}"#,
        )
        .unwrap();
        assert_eq!(p.balance, 1.5);
        assert_eq!(p.delta, 0.5);
        assert_eq!(p.kind, "dividend");
    }
}
