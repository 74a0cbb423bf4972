use std::sync::Arc;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, Method, RequestBuilder, Url, header};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use shared_utils::env::get_env_var;
use snafu::{OptionExt, ResultExt};
use tracing::{debug, warn};

use crate::{
    auth::{StaticToken, TokenSource},
    config::ClientConfig,
    models::{
        account::{AccountSummary, Order, OrdersQuery, Quote},
        bar::{Bar, BarSeries},
        cash_history::CashHistoryPayload,
        period::Period,
        position::Position,
    },
    onboarding::ApplicantReview,
    providers::{
        BrokerageApi, ProviderError, ProviderInitError,
        brokerage_rest::{
            params::{Endpoint, history_params, orders_params},
            response::{
                HistoryResponse, KycTokenResponse, OrdersResponse, PositionsResponse,
                error_message,
            },
        },
        ApiSnafu, ClientBuildSnafu, DecodeSnafu, InvalidBaseUrlSnafu, InvalidTokenSnafu,
        MissingEnvVarSnafu, ReqwestSnafu, TokenSnafu,
    },
};

const USER_AGENT: &str = concat!("portfolio-series/", env!("CARGO_PKG_VERSION"));

pub struct RestProvider {
    client: Client,
    base_url: Url,
    tokens: Arc<dyn TokenSource>,
    limiter: DefaultDirectRateLimiter,
}

impl RestProvider {
    /// Creates a provider that asks `tokens` for a bearer token per request.
    pub fn new(
        config: &ClientConfig,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self, ProviderInitError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            InvalidBaseUrlSnafu {
                url: config.base_url.clone(),
                message: e.to_string(),
            }
            .build()
        })?;
        if base_url.cannot_be_a_base() {
            return InvalidBaseUrlSnafu {
                url: config.base_url.clone(),
                message: "URL cannot be used as a base",
            }
            .fail();
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout())
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            base_url,
            tokens,
            limiter: RateLimiter::direct(Quota::per_second(config.requests_per_second)),
        })
    }

    /// Creates a provider with a static token read from `config.token_env`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ProviderInitError> {
        let token = get_env_var(&config.token_env).context(MissingEnvVarSnafu)?;
        Self::new(config, Arc::new(StaticToken::new(token)))
    }

    fn url(&self, endpoint: Endpoint<'_>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(endpoint.segments());
        }
        url
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: Endpoint<'_>,
        query: &[(String, String)],
    ) -> Result<T, ProviderError> {
        let path = endpoint.path();
        let mut builder = self.client.request(method.clone(), self.url(endpoint));
        if !query.is_empty() {
            builder = builder.query(query);
        }
        let builder = self.authorize(builder).await?;

        self.limiter.until_ready().await;
        debug!(%method, endpoint = %path, "sending request");
        let response = builder
            .send()
            .await
            .context(ReqwestSnafu { endpoint: &path })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context(ReqwestSnafu { endpoint: &path })?;

        if !status.is_success() {
            let message = error_message(&body);
            warn!(endpoint = %path, status = status.as_u16(), %message, "backend returned an error");
            return ApiSnafu {
                endpoint: path,
                status: status.as_u16(),
                message,
            }
            .fail();
        }

        serde_json::from_str(&body).context(DecodeSnafu { endpoint: path })
    }

    async fn authorize(&self, builder: RequestBuilder) -> Result<RequestBuilder, ProviderError> {
        let token = self.tokens.bearer_token().await.context(TokenSnafu)?;
        let mut value = header::HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .context(InvalidTokenSnafu)?;
        value.set_sensitive(true);
        Ok(builder.header(header::AUTHORIZATION, value))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint<'_>,
        query: &[(String, String)],
    ) -> Result<T, ProviderError> {
        self.request(Method::GET, endpoint, query).await
    }
}

#[async_trait]
impl BrokerageApi for RestProvider {
    async fn fetch_positions(&self) -> Result<Vec<Position>, ProviderError> {
        let body: PositionsResponse = self.get(Endpoint::Positions, &[]).await?;
        Ok(body.into_positions())
    }

    async fn fetch_account(&self) -> Result<AccountSummary, ProviderError> {
        self.get(Endpoint::Account, &[]).await
    }

    async fn fetch_history(
        &self,
        symbol: &str,
        period: Period,
    ) -> Result<BarSeries, ProviderError> {
        let body: HistoryResponse = self
            .get(Endpoint::History(symbol), &history_params(period))
            .await?;
        let (raw_bars, meta) = body.into_parts();

        let total = raw_bars.len();
        let mut bars: Vec<Bar> = raw_bars.iter().filter_map(|b| b.normalize()).collect();
        if bars.len() < total {
            warn!(
                symbol,
                dropped = total - bars.len(),
                "dropped bars without a usable timestamp or close"
            );
        }
        bars.sort_by_key(|b| b.timestamp);

        Ok(BarSeries {
            symbol: symbol.to_string(),
            period,
            bars,
            meta,
        })
    }

    async fn fetch_cash_history(&self) -> Result<CashHistoryPayload, ProviderError> {
        self.get(Endpoint::CashHistory, &[]).await
    }

    async fn fetch_orders(&self, query: &OrdersQuery) -> Result<Vec<Order>, ProviderError> {
        let body: OrdersResponse = self.get(Endpoint::Orders, &orders_params(query)).await?;
        Ok(body.into_orders())
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, ProviderError> {
        self.get(Endpoint::Quote(symbol), &[]).await
    }

    async fn fetch_kyc_status(&self) -> Result<ApplicantReview, ProviderError> {
        self.get(Endpoint::KycStatus, &[]).await
    }

    async fn issue_kyc_token(&self) -> Result<SecretString, ProviderError> {
        let body: KycTokenResponse = self.request(Method::POST, Endpoint::KycToken, &[]).await?;
        Some(body.token)
            .filter(|t| !t.is_empty())
            .map(SecretString::from)
            .context(ApiSnafu {
                endpoint: Endpoint::KycToken.path(),
                status: 200u16,
                message: "empty verification token",
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(base: &str) -> RestProvider {
        RestProvider::new(
            &ClientConfig::new(base),
            Arc::new(StaticToken::new("t")),
        )
        .unwrap()
    }

    #[test]
    fn url_joins_segments_and_encodes_symbols() {
        let p = provider("https://api.example.com/base");
        assert_eq!(
            p.url(Endpoint::History("BRK B")).as_str(),
            "https://api.example.com/base/api/history/BRK%20B"
        );
        let root = provider("https://api.example.com");
        assert_eq!(
            root.url(Endpoint::Positions).as_str(),
            "https://api.example.com/api/positions"
        );
    }

    #[test]
    fn rejects_non_base_url() {
        let err = RestProvider::new(
            &ClientConfig::new("mailto:someone@example.com"),
            Arc::new(StaticToken::new("t")),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ProviderInitError::InvalidBaseUrl { .. }));
    }
}
