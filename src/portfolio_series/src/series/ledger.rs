//! Ledger replay: activities in, running cash balance out.
//!
//! The running sum starts at zero, so intermediate points describe net cash
//! flow over the window rather than an absolute balance. The last point is a
//! synthetic anchor at "now" carrying the authoritative balance from the
//! account summary; only that point is reconciled; earlier points are left
//! as computed.

use indexmap::IndexMap;
use std::collections::VecDeque;
use tracing::{debug, warn};

use crate::models::activity::{Activity, FillSide, LedgerKind, RawActivity};
use crate::models::cash_history::{
    CashHistory, CashHistoryPayload, CashHistoryPoint, CashSummary, PrecomputedCashHistory,
};
use crate::series::timestamp::{normalize, to_rfc3339};

pub const CURRENT_BALANCE_LABEL: &str = "Current balance";
pub const CURRENT_BALANCE_KIND: &str = "current";

/// Signed cash effect of one activity.
///
/// Buys and covers spend cash; sells and short sales raise it. Non-trade
/// entries carry their own signed net amount. Anything unrecognized is zero.
pub fn entry_delta(activity: &Activity) -> f64 {
    match activity {
        Activity::Fill {
            side, qty, price, ..
        } => {
            let notional = qty * price;
            match side {
                FillSide::Buy | FillSide::BuyToCover => -notional,
                FillSide::Sell | FillSide::SellShort => notional,
                FillSide::Other(_) => 0.0,
            }
        }
        Activity::Ledger { net_amount, .. } => *net_amount,
        Activity::Unrecognized { .. } => 0.0,
    }
}

/// Human-readable label for one activity.
pub fn entry_label(activity: &Activity) -> String {
    match activity {
        Activity::Fill {
            symbol,
            side,
            qty,
            price,
            ..
        } => {
            let verb = match side {
                FillSide::Buy => "Buy",
                FillSide::Sell => "Sell",
                FillSide::SellShort => "Short sell",
                FillSide::BuyToCover => "Buy to cover",
                FillSide::Other(other) => return format!("Fill ({other}) {symbol}"),
            };
            format!("{verb} {qty} {symbol} @ ${price:.2}")
        }
        Activity::Ledger {
            kind,
            net_amount,
            symbol,
            ..
        } => {
            let base = match kind {
                LedgerKind::Transfer if *net_amount < 0.0 => "Transfer Out".to_string(),
                LedgerKind::Transfer => "Transfer In".to_string(),
                LedgerKind::Deposit => "Deposit".to_string(),
                LedgerKind::Withdrawal => "Withdrawal".to_string(),
                LedgerKind::Dividend => "Dividend".to_string(),
                LedgerKind::Interest => "Interest".to_string(),
                LedgerKind::Fee => "Fee".to_string(),
                LedgerKind::Other(code) => format!("Other ({code})"),
            };
            match (kind, symbol) {
                (LedgerKind::Dividend, Some(sym)) => format!("{base} ({sym})"),
                _ => base,
            }
        }
        Activity::Unrecognized { type_tag, .. } => format!("Other ({type_tag})"),
    }
}

fn entry_kind(activity: &Activity) -> String {
    match activity {
        Activity::Fill { side, .. } => match side {
            FillSide::Buy => "buy",
            FillSide::Sell => "sell",
            FillSide::SellShort => "sell_short",
            FillSide::BuyToCover => "buy_to_cover",
            FillSide::Other(_) => "fill",
        }
        .to_string(),
        Activity::Ledger { kind, .. } => kind.tag().to_string(),
        Activity::Unrecognized { .. } => "other".to_string(),
    }
}

/// Replays activities into a cash history anchored at `current_balance`.
///
/// Activities are sorted by timestamp (stable, so same-second entries keep
/// input order). The anchor point sits at `now`, or at the last activity if
/// that is later.
pub fn reconstruct(activities: &[Activity], current_balance: f64, now: i64) -> CashHistory {
    let mut ordered: Vec<&Activity> = activities.iter().collect();
    ordered.sort_by_key(|a| a.timestamp());

    let mut points = Vec::with_capacity(ordered.len() + 1);
    let mut running = 0.0;
    for activity in ordered {
        let delta = entry_delta(activity);
        running += delta;
        points.push(CashHistoryPoint {
            timestamp: activity.timestamp(),
            balance: running,
            delta,
            label: entry_label(activity),
            kind: entry_kind(activity),
            symbol: activity.symbol().map(str::to_string),
        });
    }

    let anchor_ts = points.last().map_or(now, |p| p.timestamp.max(now));
    points.push(CashHistoryPoint {
        timestamp: anchor_ts,
        balance: current_balance,
        delta: current_balance - running,
        label: CURRENT_BALANCE_LABEL.to_string(),
        kind: CURRENT_BALANCE_KIND.to_string(),
        symbol: None,
    });

    debug!(
        entries = points.len() - 1,
        drift = current_balance - running,
        "reconstructed cash history"
    );

    let summary = summarize(&points);
    CashHistory { points, summary }
}

/// Resolves raw records, skipping (and logging) those without a usable timestamp.
pub fn reconstruct_raw(raw: &[RawActivity], current_balance: f64, now: i64) -> CashHistory {
    let mut skipped = 0usize;
    let activities: Vec<Activity> = raw
        .iter()
        .filter_map(|r| {
            let resolved = r.resolve();
            if resolved.is_none() {
                skipped += 1;
            }
            resolved
        })
        .collect();
    if skipped > 0 {
        warn!(skipped, "dropped activities without a usable timestamp");
    }
    reconstruct(&activities, current_balance, now)
}

/// Normalizes whichever payload shape the backend returned.
pub fn from_payload(payload: CashHistoryPayload, current_balance: f64, now: i64) -> CashHistory {
    match payload {
        CashHistoryPayload::Precomputed(pre) => from_precomputed(pre),
        CashHistoryPayload::Activities(raw) => reconstruct_raw(&raw, current_balance, now),
        CashHistoryPayload::Envelope(env) => {
            reconstruct_raw(&env.activities, current_balance, now)
        }
    }
}

fn from_precomputed(pre: PrecomputedCashHistory) -> CashHistory {
    let mut events: IndexMap<i64, VecDeque<_>> = IndexMap::new();
    let mut skipped_events = 0usize;
    for event in pre.events {
        match normalize(&event.timestamp) {
            Some(ts) => events.entry(ts).or_default().push_back(event),
            None => skipped_events += 1,
        }
    }

    let mut points = Vec::with_capacity(pre.timestamps.len());
    let mut skipped = 0usize;
    let mut prev = 0.0;
    for (raw, &balance) in pre.timestamps.iter().zip(pre.values.iter()) {
        if !balance.is_finite() {
            continue;
        }
        let Some(timestamp) = normalize(raw) else {
            skipped += 1;
            continue;
        };
        let event = events.get_mut(&timestamp).and_then(VecDeque::pop_front);
        let point = match event {
            Some(e) => CashHistoryPoint {
                timestamp,
                balance,
                delta: e.change,
                label: e.label,
                kind: e.kind,
                symbol: e.symbol,
            },
            None => CashHistoryPoint {
                timestamp,
                balance,
                delta: balance - prev,
                label: String::new(),
                kind: "balance".to_string(),
                symbol: None,
            },
        };
        prev = balance;
        points.push(point);
    }
    if skipped > 0 || skipped_events > 0 {
        warn!(
            points = skipped,
            events = skipped_events,
            "dropped precomputed cash entries without a usable timestamp"
        );
    }
    if pre.timestamps.len() != pre.values.len() {
        warn!(
            timestamps = pre.timestamps.len(),
            values = pre.values.len(),
            "precomputed cash history arrays differ in length; truncated"
        );
    }

    let mut summary = summarize(&points);
    if let Some(current) = pre.current.filter(|c| c.is_finite()) {
        summary.current = current;
        summary.change = current - summary.start;
        summary.change_percent = percent_change(summary.start, current);
    }
    if pre.start_date.is_some() {
        summary.start_date = pre.start_date;
    }
    if pre.end_date.is_some() {
        summary.end_date = pre.end_date;
    }
    CashHistory { points, summary }
}

/// Computes summary statistics over already-ordered points.
pub fn summarize(points: &[CashHistoryPoint]) -> CashSummary {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return CashSummary {
            current: 0.0,
            min: 0.0,
            max: 0.0,
            start: 0.0,
            change: 0.0,
            change_percent: 0.0,
            count: 0,
            start_date: None,
            end_date: None,
        };
    };
    let min = points.iter().map(|p| p.balance).fold(f64::INFINITY, f64::min);
    let max = points
        .iter()
        .map(|p| p.balance)
        .fold(f64::NEG_INFINITY, f64::max);
    CashSummary {
        current: last.balance,
        min,
        max,
        start: first.balance,
        change: last.balance - first.balance,
        change_percent: percent_change(first.balance, last.balance),
        count: points.len(),
        start_date: to_rfc3339(first.timestamp),
        end_date: to_rfc3339(last.timestamp),
    }
}

fn percent_change(start: f64, current: f64) -> f64 {
    if start == 0.0 {
        0.0
    } else {
        (current - start) / start.abs() * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(ts: i64, side: FillSide, qty: f64, price: f64) -> Activity {
        Activity::Fill {
            timestamp: ts,
            symbol: "AAPL".into(),
            side,
            qty,
            price,
        }
    }

    fn ledger(ts: i64, code: &str, amount: f64) -> Activity {
        Activity::Ledger {
            timestamp: ts,
            kind: LedgerKind::from_code(code),
            net_amount: amount,
            symbol: None,
        }
    }

    #[test]
    fn reconciliation_anchors_only_last_point() {
        let history = reconstruct(
            &[
                fill(100, FillSide::Buy, 10.0, 100.0),
                fill(200, FillSide::Sell, 5.0, 120.0),
            ],
            10_000.0,
            300,
        );
        let balances: Vec<f64> = history.points.iter().map(|p| p.balance).collect();
        assert_eq!(balances, vec![-1000.0, -400.0, 10_000.0]);
        let last = history.points.last().unwrap();
        assert_eq!(last.timestamp, 300);
        assert_eq!(last.delta, 10_400.0);
        assert_eq!(last.label, CURRENT_BALANCE_LABEL);
        assert_eq!(history.summary.current, 10_000.0);
        assert_eq!(history.summary.start, -1000.0);
        assert_eq!(history.summary.min, -1000.0);
        assert_eq!(history.summary.max, 10_000.0);
        assert_eq!(history.summary.change, 11_000.0);
        assert!((history.summary.change_percent - 1100.0).abs() < 1e-9);
    }

    #[test]
    fn deltas_by_side() {
        assert_eq!(entry_delta(&fill(0, FillSide::Buy, 2.0, 50.0)), -100.0);
        assert_eq!(entry_delta(&fill(0, FillSide::BuyToCover, 2.0, 50.0)), -100.0);
        assert_eq!(entry_delta(&fill(0, FillSide::Sell, 2.0, 50.0)), 100.0);
        assert_eq!(entry_delta(&fill(0, FillSide::SellShort, 2.0, 50.0)), 100.0);
        assert_eq!(
            entry_delta(&fill(0, FillSide::Other("exercise".into()), 2.0, 50.0)),
            0.0
        );
        assert_eq!(entry_delta(&ledger(0, "CSW", -250.0)), -250.0);
    }

    #[test]
    fn sorts_stably_by_timestamp() {
        let history = reconstruct(
            &[
                ledger(300, "CSD", 1.0),
                ledger(100, "CSD", 10.0),
                ledger(100, "FEE", -2.0),
            ],
            0.0,
            400,
        );
        let deltas: Vec<f64> = history.points.iter().map(|p| p.delta).collect();
        assert_eq!(deltas[..3], [10.0, -2.0, 1.0]);
        let balances: Vec<f64> = history.points.iter().map(|p| p.balance).collect();
        assert_eq!(balances[..3], [10.0, 8.0, 9.0]);
    }

    #[test]
    fn labels_follow_lookup_table() {
        assert_eq!(
            entry_label(&fill(0, FillSide::Buy, 10.0, 100.0)),
            "Buy 10 AAPL @ $100.00"
        );
        assert_eq!(entry_label(&ledger(0, "TRANS", 50.0)), "Transfer In");
        assert_eq!(entry_label(&ledger(0, "TRANS", -50.0)), "Transfer Out");
        assert_eq!(entry_label(&ledger(0, "CSD", 50.0)), "Deposit");
        assert_eq!(entry_label(&ledger(0, "INT", 0.1)), "Interest");
        assert_eq!(entry_label(&ledger(0, "XYZ", 1.0)), "Other (XYZ)");
        let div = Activity::Ledger {
            timestamp: 0,
            kind: LedgerKind::Dividend,
            net_amount: 3.0,
            symbol: Some("MSFT".into()),
        };
        assert_eq!(entry_label(&div), "Dividend (MSFT)");
        let unknown = Activity::Unrecognized {
            timestamp: 0,
            type_tag: "MA".into(),
            symbol: None,
        };
        assert_eq!(entry_label(&unknown), "Other (MA)");
        assert_eq!(entry_delta(&unknown), 0.0);
    }

    #[test]
    fn empty_ledger_is_just_the_anchor() {
        let history = reconstruct(&[], 5_000.0, 42);
        assert_eq!(history.points.len(), 1);
        assert_eq!(history.summary.start, 5_000.0);
        assert_eq!(history.summary.change, 0.0);
        assert_eq!(history.summary.change_percent, 0.0);
    }

    #[test]
    fn anchor_never_precedes_last_activity() {
        let history = reconstruct(&[ledger(1_000, "CSD", 1.0)], 1.0, 500);
        assert_eq!(history.points.last().unwrap().timestamp, 1_000);
    }

    #[test]
    fn raw_records_degrade_per_record() {
        let raw: Vec<RawActivity> = serde_json::from_str(
            r#"[
                {"activity_type":"CSD","date":"2024-01-01","net_amount":"1000"},
                {"activity_type":"CSD","net_amount":"999"},
                {"activity_type":"MYSTERY","date":"2024-01-02"},
                {"activity_type":"FILL","transaction_time":"2024-01-03T00:00:00Z","symbol":"AAPL","side":"buy","qty":"2","price":"100"}
            ]"#,
        )
        .unwrap();
        let history = reconstruct_raw(&raw, 800.0, 1_800_000_000);
        let balances: Vec<f64> = history.points.iter().map(|p| p.balance).collect();
        assert_eq!(balances, vec![1000.0, 1000.0, 800.0, 800.0]);
        assert_eq!(history.points[1].label, "Other (MYSTERY)");
    }

    #[test]
    fn precomputed_payload_keeps_its_points() {
        let payload: CashHistoryPayload = serde_json::from_str(
            r#"{
                "timestamps": [10, 20, 30],
                "values": [100.0, 150.0, 140.0],
                "events": [
                    {"timestamp": 20, "value": 150.0, "change": 50.0, "type": "deposit", "label": "Deposit", "symbol": null}
                ],
                "current": 140.0
            }"#,
        )
        .unwrap();
        let history = from_payload(payload, 9_999.0, 40);
        assert_eq!(history.points.len(), 3);
        assert_eq!(history.points[1].label, "Deposit");
        assert_eq!(history.points[1].delta, 50.0);
        assert_eq!(history.points[2].delta, -10.0);
        assert_eq!(history.summary.current, 140.0);
        assert_eq!(history.summary.start, 100.0);
        assert!((history.summary.change_percent - 40.0).abs() < 1e-9);
    }

    #[test]
    fn precomputed_millisecond_timestamps_become_seconds() {
        let payload: CashHistoryPayload = serde_json::from_str(
            r#"{
                "timestamps": [1699000000000, 1700086400000],
                "values": [500.0, 1000.0],
                "events": [
                    {"timestamp": 1700086400000, "value": 1000.0, "change": 500.0, "type": "deposit", "label": "Deposit"}
                ]
            }"#,
        )
        .unwrap();
        let history = from_payload(payload, 0.0, 0);
        let stamps: Vec<i64> = history.points.iter().map(|p| p.timestamp).collect();
        assert_eq!(stamps, vec![1_699_000_000, 1_700_086_400]);
        assert_eq!(history.points[1].label, "Deposit");
        assert_eq!(history.points[1].delta, 500.0);
    }

    #[test]
    fn precomputed_iso_timestamps_parse_and_bad_ones_drop() {
        let payload: CashHistoryPayload = serde_json::from_str(
            r#"{
                "timestamps": ["2024-01-01T00:00:00Z", "yesterday", "2024-01-02"],
                "values": [10.0, 15.0, 20.0]
            }"#,
        )
        .unwrap();
        let history = from_payload(payload, 0.0, 0);
        let stamps: Vec<i64> = history.points.iter().map(|p| p.timestamp).collect();
        assert_eq!(stamps, vec![1_704_067_200, 1_704_153_600]);
        assert_eq!(history.points[1].delta, 10.0);
        assert_eq!(history.summary.start_date.as_deref(), Some("2024-01-01T00:00:00Z"));
    }
}
