use thiserror::Error;

use crate::onboarding::{KycStatus, SdkError};
use crate::providers::{ProviderError, ProviderInitError};

/// The unified error type for the `portfolio_series` crate.
#[derive(Debug, Error)]
pub enum Error {
    /// An error originating from the brokerage backend.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The provider could not be constructed.
    #[error("Provider setup failed: {0}")]
    ProviderInit(#[from] ProviderInitError),

    /// An error related to configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The configuration file is not valid TOML for [`crate::config::ClientConfig`].
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A generic I/O error.
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// The verification SDK failed to load or launch.
    #[error("Verification SDK error: {0}")]
    Sdk(#[from] SdkError),

    /// Verification was requested while the applicant does not need it.
    #[error("Verification cannot be launched while status is {0}")]
    VerificationNotRequired(KycStatus),

    /// The SDK was already launched for this session.
    #[error("Verification SDK already launched")]
    AlreadyLaunched,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
