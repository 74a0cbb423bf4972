#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use portfolio_series::{
    models::{
        account::{AccountSummary, Order, OrdersQuery, Quote},
        bar::{Bar, BarSeries},
        cash_history::CashHistoryPayload,
        period::Period,
        position::{Position, Side},
    },
    onboarding::ApplicantReview,
    providers::{ApiSnafu, BrokerageApi, ProviderError},
};
use secrecy::SecretString;

pub fn position(symbol: &str, qty: f64, market_value: f64, filled_at: Option<i64>) -> Position {
    Position {
        symbol: symbol.to_string(),
        qty,
        market_value,
        current_price: if qty != 0.0 { market_value / qty } else { 0.0 },
        filled_at,
        side: if qty < 0.0 { Side::Short } else { Side::Long },
    }
}

pub fn bars(closes: &[(i64, f64)]) -> Vec<Bar> {
    closes
        .iter()
        .map(|&(timestamp, close)| Bar {
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume: 10,
        })
        .collect()
}

fn api_error(endpoint: &str, status: u16) -> ProviderError {
    ApiSnafu {
        endpoint,
        status,
        message: "unavailable",
    }
    .build()
}

/// In-memory backend with configurable failures and latency.
#[derive(Default)]
pub struct FakeBrokerage {
    pub positions: Option<Vec<Position>>,
    pub account: Option<AccountSummary>,
    pub cash: Option<serde_json::Value>,
    pub histories: HashMap<String, Vec<Bar>>,
    /// Applied to positions, account and cash history.
    pub delay: Duration,
    pub history_delays: HashMap<String, Duration>,
    pub review: ApplicantReview,
    pub history_calls: AtomicUsize,
    pub token_calls: AtomicUsize,
}

impl FakeBrokerage {
    pub fn with_positions(positions: Vec<Position>) -> Self {
        Self {
            positions: Some(positions),
            account: Some(AccountSummary {
                cash_balance: Some(1_000.0),
                ..AccountSummary::default()
            }),
            cash: Some(serde_json::json!([])),
            ..Self::default()
        }
    }

    pub fn history(mut self, symbol: &str, closes: &[(i64, f64)]) -> Self {
        self.histories.insert(symbol.to_string(), bars(closes));
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl BrokerageApi for FakeBrokerage {
    async fn fetch_positions(&self) -> Result<Vec<Position>, ProviderError> {
        tokio::time::sleep(self.delay).await;
        self.positions
            .clone()
            .ok_or_else(|| api_error("/api/positions", 503))
    }

    async fn fetch_account(&self) -> Result<AccountSummary, ProviderError> {
        tokio::time::sleep(self.delay).await;
        self.account
            .clone()
            .ok_or_else(|| api_error("/api/account", 500))
    }

    async fn fetch_history(
        &self,
        symbol: &str,
        period: Period,
    ) -> Result<BarSeries, ProviderError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.history_delays.get(symbol) {
            tokio::time::sleep(*delay).await;
        }
        let bars = self
            .histories
            .get(symbol)
            .cloned()
            .ok_or_else(|| api_error("/api/history", 404))?;
        Ok(BarSeries {
            symbol: symbol.to_string(),
            period,
            bars,
            meta: None,
        })
    }

    async fn fetch_cash_history(&self) -> Result<CashHistoryPayload, ProviderError> {
        tokio::time::sleep(self.delay).await;
        let value = self
            .cash
            .clone()
            .ok_or_else(|| api_error("/api/account/cash-history", 500))?;
        serde_json::from_value(value).map_err(|_| api_error("/api/account/cash-history", 422))
    }

    async fn fetch_orders(&self, _query: &OrdersQuery) -> Result<Vec<Order>, ProviderError> {
        Ok(Vec::new())
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, ProviderError> {
        Ok(Quote {
            symbol: symbol.to_string(),
            price: Some(1.0),
            change: None,
            change_percent: None,
        })
    }

    async fn fetch_kyc_status(&self) -> Result<ApplicantReview, ProviderError> {
        Ok(self.review.clone())
    }

    async fn issue_kyc_token(&self) -> Result<SecretString, ProviderError> {
        let n = self.token_calls.fetch_add(1, Ordering::SeqCst);
        Ok(SecretString::from(format!("sdk-token-{n}")))
    }
}
