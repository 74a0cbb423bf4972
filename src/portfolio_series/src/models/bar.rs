//! Canonical in-memory representation of a time-series bar (OHLCV).
//!
//! The history endpoint is loose about timestamps (see
//! [`series::timestamp`](crate::series::timestamp)); [`RawBar`] captures the
//! wire shape and [`RawBar::normalize`] turns it into a [`Bar`] keyed by Unix
//! seconds. Everything past the provider boundary only sees [`Bar`].

use serde::{Deserialize, Serialize};

use crate::models::{de, period::Period};
use crate::series::timestamp::{RawTimestamp, pick_timestamp};

/// A single time-series bar (OHLCV) for a given timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Bar start, Unix seconds (UTC).
    pub timestamp: i64,

    /// Opening price.
    pub open: f64,

    /// Highest price during the bar interval.
    pub high: f64,

    /// Lowest price during the bar interval.
    pub low: f64,

    /// Closing price.
    pub close: f64,

    /// Volume traded during the bar interval.
    pub volume: u64,
}

/// A bar exactly as the history endpoint returns it.
///
/// The timestamp can live under `timestamp`, `t`, `time` or `date`, and be a
/// string or a number. Only `close` is guaranteed; the other prices fall back to
/// `close` when absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBar {
    #[serde(default)]
    pub timestamp: Option<RawTimestamp>,
    #[serde(default)]
    pub t: Option<RawTimestamp>,
    #[serde(default)]
    pub time: Option<RawTimestamp>,
    #[serde(default)]
    pub date: Option<RawTimestamp>,
    #[serde(default, deserialize_with = "de::opt_f64_lenient")]
    pub open: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_lenient")]
    pub high: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_lenient")]
    pub low: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_lenient")]
    pub close: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_lenient")]
    pub volume: Option<f64>,
}

impl RawBar {
    /// Resolves the timestamp (priority `timestamp`, `t`, `time`, `date`).
    pub fn resolved_timestamp(&self) -> Option<i64> {
        pick_timestamp([
            self.timestamp.as_ref(),
            self.t.as_ref(),
            self.time.as_ref(),
            self.date.as_ref(),
        ])
    }

    /// Converts to a [`Bar`], or `None` if the timestamp or close is unusable.
    pub fn normalize(&self) -> Option<Bar> {
        let timestamp = self.resolved_timestamp()?;
        let close = self.close?;
        Some(Bar {
            timestamp,
            open: self.open.unwrap_or(close),
            high: self.high.unwrap_or(close),
            low: self.low.unwrap_or(close),
            close,
            volume: self.volume.map(|v| v.max(0.0) as u64).unwrap_or(0),
        })
    }
}

/// Optional instrument metadata attached to a history response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentMeta {
    #[serde(default)]
    pub long_name: Option<String>,
    #[serde(default)]
    pub short_name: Option<String>,
}

/// Represents a complete set of time-series data for a single symbol.
///
/// This struct groups a vector of [`Bar`]s with their corresponding symbol
/// and [`Period`], making the data set self-describing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    /// The symbol this data represents (e.g., "AAPL").
    pub symbol: String,
    /// The chart window the bars were requested for.
    pub period: Period,
    /// The collection of OHLCV bars, ascending by timestamp.
    pub bars: Vec<Bar>,
    /// Instrument names, when the backend supplies them.
    #[serde(default)]
    pub meta: Option<InstrumentMeta>,
}

impl BarSeries {
    /// An empty series, used in place of a failed per-symbol fetch.
    pub fn empty(symbol: impl Into<String>, period: Period) -> Self {
        Self {
            symbol: symbol.into(),
            period,
            bars: Vec::new(),
            meta: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Long name, then short name, then the symbol itself.
    pub fn display_name(&self) -> &str {
        self.meta
            .as_ref()
            .and_then(|m| m.long_name.as_deref().or(m.short_name.as_deref()))
            .unwrap_or(&self.symbol)
    }

    /// `(timestamp, close)` pairs, the shape the aligner consumes.
    pub fn closes(&self) -> Vec<(i64, f64)> {
        self.bars.iter().map(|b| (b.timestamp, b.close)).collect()
    }

    /// Window statistics for a single-instrument view.
    pub fn summary(&self) -> Option<BarSummary> {
        let first = self.bars.first()?;
        let last = self.bars.last()?;
        let change_percent = if first.close != 0.0 {
            (last.close - first.close) / first.close * 100.0
        } else {
            0.0
        };
        Some(BarSummary {
            price: last.close,
            change_percent,
            open: first.open,
            high: self.bars.iter().map(|b| b.high).fold(f64::MIN, f64::max),
            low: self.bars.iter().map(|b| b.low).fold(f64::MAX, f64::min),
            volume: self.bars.iter().map(|b| b.volume).sum(),
        })
    }
}

/// Period statistics over a bar series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSummary {
    /// Latest close.
    pub price: f64,
    /// First close to latest close, in percent.
    pub change_percent: f64,
    /// Open of the first bar.
    pub open: f64,
    pub high: f64,
    pub low: f64,
    /// Total volume across the window.
    pub volume: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(ts: i64, close: f64) -> Bar {
        Bar {
            timestamp: ts,
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 100,
        }
    }

    #[test]
    fn raw_bar_field_priority() {
        let raw: RawBar =
            serde_json::from_str(r#"{"t": 1700000000000, "date": "2020-01-01", "close": "10.5"}"#)
                .unwrap();
        let b = raw.normalize().unwrap();
        assert_eq!(b.timestamp, 1_700_000_000);
        assert_eq!(b.close, 10.5);
        assert_eq!(b.open, 10.5);
        assert_eq!(b.volume, 0);
    }

    #[test]
    fn raw_bar_without_timestamp_or_close_is_dropped() {
        let no_ts: RawBar = serde_json::from_str(r#"{"close": 1}"#).unwrap();
        assert!(no_ts.normalize().is_none());
        let bad_ts: RawBar = serde_json::from_str(r#"{"time": "soon", "close": 1}"#).unwrap();
        assert!(bad_ts.normalize().is_none());
        let no_close: RawBar = serde_json::from_str(r#"{"timestamp": 5}"#).unwrap();
        assert!(no_close.normalize().is_none());
    }

    #[test]
    fn display_name_fallbacks() {
        let mut s = BarSeries::empty("AAPL", Period::OneMonth);
        assert_eq!(s.display_name(), "AAPL");
        s.meta = Some(InstrumentMeta {
            long_name: None,
            short_name: Some("Apple".into()),
        });
        assert_eq!(s.display_name(), "Apple");
        s.meta = Some(InstrumentMeta {
            long_name: Some("Apple Inc.".into()),
            short_name: Some("Apple".into()),
        });
        assert_eq!(s.display_name(), "Apple Inc.");
    }

    #[test]
    fn summary_over_window() {
        let s = BarSeries {
            symbol: "X".into(),
            period: Period::OneWeek,
            bars: vec![bar(1, 100.0), bar(2, 90.0), bar(3, 110.0)],
            meta: None,
        };
        let sum = s.summary().unwrap();
        assert_eq!(sum.price, 110.0);
        assert!((sum.change_percent - 10.0).abs() < 1e-9);
        assert_eq!(sum.high, 111.0);
        assert_eq!(sum.low, 89.0);
        assert_eq!(sum.volume, 300);
        assert!(BarSeries::empty("Y", Period::OneDay).summary().is_none());
    }
}
