//! Client configuration loaded from TOML.
//!
//! ```toml
//! base_url = "https://broker.example.com"
//! request_timeout_ms = 10000
//! fetch_timeout_ms = 15000
//! requests_per_second = 10
//! default_period = "1M"
//! token_env = "BROKER_API_TOKEN"
//! ```
//!
//! Only `base_url` is required. The bearer token itself never lives in the
//! file; `token_env` names the environment variable that holds it.
//! `PORTFOLIO_SERIES_BASE_URL` and `PORTFOLIO_SERIES_TIMEOUT_MS` override the
//! file when set (see [`ClientConfig::with_env_overrides`]).

use std::{num::NonZeroU32, path::Path, time::Duration};

use nonzero_ext::nonzero;
use serde::{Deserialize, Serialize};
use shared_utils::env::{get_env_var, parse_env_var};

use crate::errors::{Error, Result};
use crate::models::period::Period;

pub const DEFAULT_TOKEN_ENV: &str = "BROKER_API_TOKEN";
pub const BASE_URL_ENV: &str = "PORTFOLIO_SERIES_BASE_URL";
pub const TIMEOUT_ENV: &str = "PORTFOLIO_SERIES_TIMEOUT_MS";

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_FETCH_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_REQUESTS_PER_SECOND: NonZeroU32 = nonzero!(10u32);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Backend origin, e.g. `https://broker.example.com`. Trailing slashes are
    /// stripped.
    pub base_url: String,
    /// HTTP-level timeout for a single request.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Upper bound on one fetch inside a load cycle, token lookup and rate
    /// limiting included.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: NonZeroU32,
    #[serde(default)]
    pub default_period: Period,
    /// Environment variable holding the bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_fetch_timeout_ms() -> u64 {
    DEFAULT_FETCH_TIMEOUT_MS
}

fn default_requests_per_second() -> NonZeroU32 {
    DEFAULT_REQUESTS_PER_SECOND
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

impl ClientConfig {
    /// Config with defaults for everything but the base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            default_period: Period::default(),
            token_env: default_token_env(),
        }
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mut config: ClientConfig = toml::from_str(text)?;
        config.normalize()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Applies `PORTFOLIO_SERIES_BASE_URL` / `PORTFOLIO_SERIES_TIMEOUT_MS`.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(url) = get_env_var(BASE_URL_ENV) {
            self.base_url = url;
        }
        if let Some(ms) =
            parse_env_var::<u64>(TIMEOUT_ENV).map_err(|e| Error::Config(e.to_string()))?
        {
            self.request_timeout_ms = ms;
        }
        self.normalize()?;
        Ok(self)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    fn normalize(&mut self) -> Result<()> {
        let url = self.base_url.trim().trim_end_matches('/');
        if url.is_empty() {
            return Err(Error::Config("base_url cannot be empty".into()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "base_url must start with http:// or https://, got {url:?}"
            )));
        }
        self.base_url = url.to_string();

        self.token_env = self.token_env.trim().to_string();
        if self.token_env.is_empty() {
            return Err(Error::Config("token_env cannot be empty".into()));
        }
        if self.request_timeout_ms == 0 || self.fetch_timeout_ms == 0 {
            return Err(Error::Config("timeouts must be greater than zero".into()));
        }
        Ok(())
    }
}
