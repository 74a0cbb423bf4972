use crate::models::{account::OrdersQuery, period::Period};

/// A backend endpoint, with any path parameters it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint<'a> {
    Positions,
    Account,
    History(&'a str),
    CashHistory,
    Orders,
    Quote(&'a str),
    KycStatus,
    KycToken,
}

impl<'a> Endpoint<'a> {
    /// Path segments below the base URL. Path parameters are returned raw;
    /// the URL builder percent-encodes each segment.
    pub fn segments(&self) -> Vec<&'a str> {
        match *self {
            Endpoint::Positions => vec!["api", "positions"],
            Endpoint::Account => vec!["api", "account"],
            Endpoint::History(symbol) => vec!["api", "history", symbol],
            Endpoint::CashHistory => vec!["api", "account", "cash-history"],
            Endpoint::Orders => vec!["api", "orders"],
            Endpoint::Quote(symbol) => vec!["api", "quote", symbol],
            Endpoint::KycStatus => vec!["api", "kyc", "status"],
            Endpoint::KycToken => vec!["api", "kyc", "token"],
        }
    }

    /// Display form used in logs and errors.
    pub fn path(&self) -> String {
        let mut path = String::new();
        for segment in self.segments() {
            path.push('/');
            path.push_str(segment);
        }
        path
    }
}

/// Query for the history endpoint.
pub fn history_params(period: Period) -> Vec<(String, String)> {
    vec![
        ("range".to_string(), period.range().to_string()),
        ("interval".to_string(), period.interval().to_string()),
    ]
}

/// Query for the orders endpoint.
pub fn orders_params(query: &OrdersQuery) -> Vec<(String, String)> {
    query.to_query_pairs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_paths() {
        assert_eq!(Endpoint::Positions.path(), "/api/positions");
        assert_eq!(Endpoint::History("AAPL").path(), "/api/history/AAPL");
        assert_eq!(Endpoint::CashHistory.path(), "/api/account/cash-history");
        assert_eq!(Endpoint::KycToken.path(), "/api/kyc/token");
    }

    #[test]
    fn history_query_follows_period_table() {
        assert_eq!(
            history_params(Period::OneWeek),
            vec![
                ("range".to_string(), "5d".to_string()),
                ("interval".to_string(), "15m".to_string())
            ]
        );
        assert_eq!(history_params(Period::All)[1].1, "1wk");
    }
}
