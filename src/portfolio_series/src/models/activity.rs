//! Cash-affecting account activities.
//!
//! [`RawActivity`] mirrors the activities endpoint, where trade fills and
//! non-trade ledger entries share one loosely-typed record. [`RawActivity::resolve`]
//! turns it into the [`Activity`] variant once, at the boundary, so the ledger
//! reconstructor never inspects field names.

use serde::{Deserialize, Serialize};

use crate::models::de;
use crate::series::timestamp::{RawTimestamp, pick_timestamp};

/// Side of an executed trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillSide {
    Buy,
    Sell,
    SellShort,
    BuyToCover,
    /// Side string the backend sent that we do not model.
    Other(String),
}

impl FillSide {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "buy" => FillSide::Buy,
            "sell" => FillSide::Sell,
            "sell_short" | "short" => FillSide::SellShort,
            "buy_to_cover" | "cover" => FillSide::BuyToCover,
            other => FillSide::Other(other.to_string()),
        }
    }
}

/// Category of a non-trade ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerKind {
    Transfer,
    Deposit,
    Withdrawal,
    Dividend,
    Interest,
    Fee,
    /// Unlisted activity code, kept verbatim for the label.
    Other(String),
}

impl LedgerKind {
    /// Fixed activity-code lookup.
    pub fn from_code(code: &str) -> Self {
        let code = code.trim().to_ascii_uppercase();
        match code.as_str() {
            "CSD" => LedgerKind::Deposit,
            "CSW" => LedgerKind::Withdrawal,
            "TRANS" | "JNLC" | "ACATC" => LedgerKind::Transfer,
            "FEE" | "PTC" | "CFEE" | "DIVFEE" => LedgerKind::Fee,
            c if c.starts_with("DIV") => LedgerKind::Dividend,
            c if c.starts_with("INT") => LedgerKind::Interest,
            _ => LedgerKind::Other(code.clone()),
        }
    }

    /// Short machine tag used as the point `type`.
    pub fn tag(&self) -> &str {
        match self {
            LedgerKind::Transfer => "transfer",
            LedgerKind::Deposit => "deposit",
            LedgerKind::Withdrawal => "withdrawal",
            LedgerKind::Dividend => "dividend",
            LedgerKind::Interest => "interest",
            LedgerKind::Fee => "fee",
            LedgerKind::Other(_) => "other",
        }
    }
}

/// One cash-affecting event, resolved from the wire record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Activity {
    Fill {
        timestamp: i64,
        symbol: String,
        side: FillSide,
        qty: f64,
        price: f64,
    },
    Ledger {
        timestamp: i64,
        kind: LedgerKind,
        net_amount: f64,
        symbol: Option<String>,
    },
    /// A record we could place in time but not interpret.
    Unrecognized {
        timestamp: i64,
        type_tag: String,
        symbol: Option<String>,
    },
}

impl Activity {
    pub fn timestamp(&self) -> i64 {
        match self {
            Activity::Fill { timestamp, .. }
            | Activity::Ledger { timestamp, .. }
            | Activity::Unrecognized { timestamp, .. } => *timestamp,
        }
    }

    pub fn symbol(&self) -> Option<&str> {
        match self {
            Activity::Fill { symbol, .. } => Some(symbol),
            Activity::Ledger { symbol, .. } | Activity::Unrecognized { symbol, .. } => {
                symbol.as_deref()
            }
        }
    }
}

/// An activity record as the backend sends it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawActivity {
    #[serde(default, alias = "activityType")]
    pub activity_type: Option<String>,
    #[serde(default, alias = "transactionTime")]
    pub transaction_time: Option<RawTimestamp>,
    #[serde(default)]
    pub timestamp: Option<RawTimestamp>,
    #[serde(default)]
    pub date: Option<RawTimestamp>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default, deserialize_with = "de::opt_f64_lenient")]
    pub qty: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_lenient")]
    pub price: Option<f64>,
    #[serde(default, alias = "netAmount", deserialize_with = "de::opt_f64_lenient")]
    pub net_amount: Option<f64>,
}

impl RawActivity {
    /// Resolves the record into an [`Activity`].
    ///
    /// Returns `None` only when no timestamp can be recovered; every other
    /// defect degrades to [`Activity::Unrecognized`].
    pub fn resolve(&self) -> Option<Activity> {
        let timestamp = pick_timestamp([
            self.transaction_time.as_ref(),
            self.timestamp.as_ref(),
            self.date.as_ref(),
        ])?;
        let type_tag = self
            .activity_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("OTHER")
            .to_ascii_uppercase();
        let symbol = self.symbol.clone().filter(|s| !s.is_empty());

        let unrecognized = |type_tag: String| Activity::Unrecognized {
            timestamp,
            type_tag,
            symbol: symbol.clone(),
        };

        if matches!(type_tag.as_str(), "FILL" | "PARTIAL_FILL") {
            return match (self.qty, self.price, &symbol) {
                (Some(qty), Some(price), Some(sym)) => Some(Activity::Fill {
                    timestamp,
                    symbol: sym.clone(),
                    side: FillSide::parse(self.side.as_deref().unwrap_or_default()),
                    qty: qty.abs(),
                    price,
                }),
                _ => Some(unrecognized(type_tag)),
            };
        }

        match self.net_amount {
            Some(net_amount) => Some(Activity::Ledger {
                timestamp,
                kind: LedgerKind::from_code(&type_tag),
                net_amount,
                symbol: symbol.clone(),
            }),
            None => Some(unrecognized(type_tag)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: &str) -> RawActivity {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn fill_record_resolves() {
        let a = raw(
            r#"{"activity_type":"FILL","transaction_time":"2024-03-01T15:00:00Z","symbol":"AAPL","side":"sell_short","qty":"5","price":"120"}"#,
        )
        .resolve()
        .unwrap();
        match a {
            Activity::Fill {
                side, qty, price, ..
            } => {
                assert_eq!(side, FillSide::SellShort);
                assert_eq!(qty, 5.0);
                assert_eq!(price, 120.0);
            }
            other => panic!("expected fill, got {other:?}"),
        }
    }

    #[test]
    fn ledger_codes_map_through_table() {
        assert_eq!(LedgerKind::from_code("csd"), LedgerKind::Deposit);
        assert_eq!(LedgerKind::from_code("CSW"), LedgerKind::Withdrawal);
        assert_eq!(LedgerKind::from_code("DIVNRA"), LedgerKind::Dividend);
        assert_eq!(LedgerKind::from_code("INT"), LedgerKind::Interest);
        assert_eq!(LedgerKind::from_code("DIVFEE"), LedgerKind::Fee);
        assert_eq!(LedgerKind::from_code("JNLC"), LedgerKind::Transfer);
        assert_eq!(
            LedgerKind::from_code("MA"),
            LedgerKind::Other("MA".to_string())
        );
    }

    #[test]
    fn non_trade_uses_date_when_no_transaction_time() {
        let a = raw(r#"{"activity_type":"DIV","date":"2024-03-01","net_amount":"1.25","symbol":"MSFT"}"#)
            .resolve()
            .unwrap();
        assert_eq!(a.timestamp(), 1_709_251_200);
        assert_eq!(a.symbol(), Some("MSFT"));
        assert!(matches!(a, Activity::Ledger { kind: LedgerKind::Dividend, net_amount, .. } if net_amount == 1.25));
    }

    #[test]
    fn incomplete_records_degrade() {
        let fill_without_price =
            raw(r#"{"activity_type":"FILL","timestamp":1700000000,"symbol":"X","qty":1}"#)
                .resolve()
                .unwrap();
        assert!(matches!(fill_without_price, Activity::Unrecognized { ref type_tag, .. } if type_tag == "FILL"));

        let no_amount = raw(r#"{"activity_type":"FEE","timestamp":1700000000}"#)
            .resolve()
            .unwrap();
        assert!(matches!(no_amount, Activity::Unrecognized { .. }));

        assert!(raw(r#"{"activity_type":"CSD","net_amount":5}"#).resolve().is_none());
    }
}
