//! Provider abstraction for the brokerage backend.
//!
//! This module defines the [`BrokerageApi`] trait, the single interface the
//! load cycle and the onboarding gate use to reach the backend. The concrete
//! REST client lives in [`brokerage_rest`]; tests substitute in-memory fakes.
//!
//! The trait is async and object safe, so `dyn BrokerageApi` works for runtime
//! selection (for example, one provider per linked account).
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use portfolio_series::models::{
//!     account::{AccountSummary, Order, OrdersQuery, Quote},
//!     bar::BarSeries,
//!     cash_history::CashHistoryPayload,
//!     period::Period,
//!     position::Position,
//! };
//! use portfolio_series::onboarding::ApplicantReview;
//! use portfolio_series::providers::{BrokerageApi, ProviderError};
//! use secrecy::SecretString;
//!
//! struct NoPositions;
//!
//! #[async_trait]
//! impl BrokerageApi for NoPositions {
//!     async fn fetch_positions(&self) -> Result<Vec<Position>, ProviderError> {
//!         Ok(vec![])
//!     }
//!     async fn fetch_account(&self) -> Result<AccountSummary, ProviderError> {
//!         Ok(AccountSummary::default())
//!     }
//!     async fn fetch_history(&self, symbol: &str, period: Period) -> Result<BarSeries, ProviderError> {
//!         Ok(BarSeries::empty(symbol, period))
//!     }
//!     async fn fetch_cash_history(&self) -> Result<CashHistoryPayload, ProviderError> {
//!         Ok(CashHistoryPayload::Activities(vec![]))
//!     }
//!     async fn fetch_orders(&self, _query: &OrdersQuery) -> Result<Vec<Order>, ProviderError> {
//!         Ok(vec![])
//!     }
//!     async fn fetch_quote(&self, symbol: &str) -> Result<Quote, ProviderError> {
//!         Ok(Quote { symbol: symbol.to_string(), price: None, change: None, change_percent: None })
//!     }
//!     async fn fetch_kyc_status(&self) -> Result<ApplicantReview, ProviderError> {
//!         Ok(ApplicantReview::default())
//!     }
//!     async fn issue_kyc_token(&self) -> Result<SecretString, ProviderError> {
//!         Ok(SecretString::from("token".to_string()))
//!     }
//! }
//! ```

pub mod brokerage_rest;

use async_trait::async_trait;
use secrecy::SecretString;
use shared_utils::env::MissingEnvVarError;
use snafu::{Backtrace, Snafu};

use crate::auth::TokenError;
use crate::models::{
    account::{AccountSummary, Order, OrdersQuery, Quote},
    bar::BarSeries,
    cash_history::CashHistoryPayload,
    period::Period,
    position::Position,
};
use crate::onboarding::ApplicantReview;

/// Everything the client needs from the brokerage backend.
///
/// Each method is one independent request. Implementations must not retry
/// internally; the caller decides how a failure degrades.
#[async_trait]
pub trait BrokerageApi: Send + Sync {
    /// Open positions, in the order the backend lists them.
    async fn fetch_positions(&self) -> Result<Vec<Position>, ProviderError>;

    /// Account summary, including the authoritative cash balance.
    async fn fetch_account(&self) -> Result<AccountSummary, ProviderError>;

    /// Bar history for one symbol over `period`.
    async fn fetch_history(&self, symbol: &str, period: Period)
    -> Result<BarSeries, ProviderError>;

    /// Cash history, either pre-computed or as raw activities.
    async fn fetch_cash_history(&self) -> Result<CashHistoryPayload, ProviderError>;

    async fn fetch_orders(&self, query: &OrdersQuery) -> Result<Vec<Order>, ProviderError>;

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, ProviderError>;

    /// Current identity-verification review.
    async fn fetch_kyc_status(&self) -> Result<ApplicantReview, ProviderError>;

    /// Short-lived access token for the verification SDK.
    async fn issue_kyc_token(&self) -> Result<SecretString, ProviderError>;
}

/// Errors that can occur during the creation of a provider instance
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// missed environment variable.
    #[snafu(display("Missing environment variable: {source}"))]
    MissingEnvVar {
        source: MissingEnvVarError,
        backtrace: Backtrace,
    },

    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// Base URL is not an absolute http(s) URL.
    #[snafu(display("Invalid base URL {url:?}: {message}"))]
    InvalidBaseUrl {
        url: String,
        message: String,
        backtrace: Backtrace,
    },
}

/// Errors that can occur within a `BrokerageApi` implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// An error during an API request (e.g., network failure, timeout).
    #[snafu(display("API request to {endpoint} failed: {source}"))]
    Reqwest {
        endpoint: String,
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The backend answered with a non-success status.
    #[snafu(display("API error ({status}) from {endpoint}: {message}"))]
    Api {
        endpoint: String,
        status: u16,
        message: String,
        backtrace: Backtrace,
    },

    /// The response body did not match the expected shape.
    #[snafu(display("Unexpected response body from {endpoint}: {source}"))]
    Decode {
        endpoint: String,
        source: serde_json::Error,
        backtrace: Backtrace,
    },

    /// No bearer token could be obtained.
    #[snafu(display("Authentication failed: {source}"))]
    Token {
        #[snafu(backtrace)]
        source: TokenError,
    },

    /// The bearer token cannot be sent as a header value.
    #[snafu(display("Invalid bearer token format: {source}"))]
    InvalidToken {
        source: reqwest::header::InvalidHeaderValue,
        backtrace: Backtrace,
    },

    /// An error during provider configuration or initialization.
    #[snafu(display("Provider initialization error: {source}"))]
    Init {
        #[snafu(backtrace)]
        source: ProviderInitError,
    },
}

impl ProviderError {
    /// HTTP status for [`ProviderError::Api`].
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
