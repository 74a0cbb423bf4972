use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeriodError {
    #[error("Invalid period: {input} (expected one of 1D, 1W, 1M, 3M, 1Y, ALL)")]
    InvalidInput { input: String },
}

/// Chart window selectable by the user.
///
/// Each period maps to a fixed `(range, interval)` pair understood by the
/// history endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1D")]
    OneDay,
    #[serde(rename = "1W")]
    OneWeek,
    #[default]
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "3M")]
    ThreeMonths,
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "ALL")]
    All,
}

impl Period {
    pub const ALL_PERIODS: [Period; 6] = [
        Period::OneDay,
        Period::OneWeek,
        Period::OneMonth,
        Period::ThreeMonths,
        Period::OneYear,
        Period::All,
    ];

    /// Lookback passed as the `range` query parameter.
    pub const fn range(self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::OneWeek => "5d",
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::OneYear => "1y",
            Period::All => "5y",
        }
    }

    /// Bar size passed as the `interval` query parameter.
    pub const fn interval(self) -> &'static str {
        match self {
            Period::OneDay => "5m",
            Period::OneWeek => "15m",
            Period::OneMonth | Period::ThreeMonths | Period::OneYear => "1d",
            Period::All => "1wk",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Period::OneDay => "1D",
            Period::OneWeek => "1W",
            Period::OneMonth => "1M",
            Period::ThreeMonths => "3M",
            Period::OneYear => "1Y",
            Period::All => "ALL",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Period {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Period::ALL_PERIODS
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| PeriodError::InvalidInput {
                input: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_interval_table() {
        let table: Vec<_> = Period::ALL_PERIODS
            .iter()
            .map(|p| (p.label(), p.range(), p.interval()))
            .collect();
        assert_eq!(
            table,
            vec![
                ("1D", "1d", "5m"),
                ("1W", "5d", "15m"),
                ("1M", "1mo", "1d"),
                ("3M", "3mo", "1d"),
                ("1Y", "1y", "1d"),
                ("ALL", "5y", "1wk"),
            ]
        );
    }

    #[test]
    fn parse_is_case_insensitive_and_roundtrips_display() {
        assert_eq!("all".parse::<Period>().unwrap(), Period::All);
        assert_eq!(" 3m ".parse::<Period>().unwrap(), Period::ThreeMonths);
        for p in Period::ALL_PERIODS {
            assert_eq!(p.to_string().parse::<Period>().unwrap(), p);
        }
    }

    #[test]
    fn parse_rejects_unknown_label() {
        assert_eq!(
            "2W".parse::<Period>(),
            Err(PeriodError::InvalidInput { input: "2W".into() })
        );
    }

    #[test]
    fn serde_uses_short_labels() {
        assert_eq!(serde_json::to_string(&Period::OneYear).unwrap(), "\"1Y\"");
        let p: Period = serde_json::from_str("\"1W\"").unwrap();
        assert_eq!(p, Period::OneWeek);
    }
}
