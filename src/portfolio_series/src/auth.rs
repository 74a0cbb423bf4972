//! Bearer-token source for backend requests.
//!
//! The identity provider is an external collaborator. Every request asks the
//! [`TokenSource`] for a token; implementations decide whether that means a
//! cached value or a fresh round-trip.

use async_trait::async_trait;
use secrecy::SecretString;
use shared_utils::env::{MissingEnvVarError, get_env_var};
use snafu::{Backtrace, ResultExt, Snafu};

/// Errors raised while obtaining a bearer token.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TokenError {
    /// The token variable is not set.
    #[snafu(display("Bearer token unavailable: {source}"))]
    MissingToken {
        source: MissingEnvVarError,
        backtrace: Backtrace,
    },

    /// The identity provider declined to issue a token.
    #[snafu(display("Identity provider refused to issue a token: {message}"))]
    Refused {
        message: String,
        backtrace: Backtrace,
    },
}

/// Supplies the bearer token attached to every backend request.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn bearer_token(&self) -> Result<SecretString, TokenError>;
}

/// A fixed token, typically read once from the environment.
#[derive(Debug, Clone)]
pub struct StaticToken(SecretString);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Reads the token from `var`.
    pub fn from_env(var: &str) -> Result<Self, TokenError> {
        let token = get_env_var(var).context(MissingTokenSnafu)?;
        Ok(Self::new(token))
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn bearer_token(&self) -> Result<SecretString, TokenError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;

    #[tokio::test]
    async fn static_token_is_returned_verbatim() {
        let source = StaticToken::new("abc123");
        let token = source.bearer_token().await.unwrap();
        assert_eq!(token.expose_secret(), "abc123");
    }

    #[test]
    #[serial]
    fn from_env_reports_missing_variable() {
        // SAFETY: serialized with other env-mutating tests.
        unsafe { std::env::remove_var("PORTFOLIO_SERIES_TEST_TOKEN") };
        let err = StaticToken::from_env("PORTFOLIO_SERIES_TEST_TOKEN").unwrap_err();
        assert!(matches!(err, TokenError::MissingToken { .. }));
        assert!(err.to_string().contains("PORTFOLIO_SERIES_TEST_TOKEN"));
    }

    #[test]
    #[serial]
    fn from_env_reads_variable() {
        // SAFETY: serialized with other env-mutating tests.
        unsafe { std::env::set_var("PORTFOLIO_SERIES_TEST_TOKEN", "from-env") };
        let token = StaticToken::from_env("PORTFOLIO_SERIES_TEST_TOKEN").unwrap();
        assert_eq!(token.0.expose_secret(), "from-env");
        unsafe { std::env::remove_var("PORTFOLIO_SERIES_TEST_TOKEN") };
    }
}
