//! Identity-verification gate.
//!
//! The verification SDK is an injected capability ([`VerificationSdk`]) with an
//! explicit load / launch / event contract. [`KycGate`] owns the state machine:
//!
//! ```text
//! check ──> Verified | Pending | Required | Failed
//! Required | Failed ──launch──> (SDK running) ──events──> Pending | Failed | Verified
//! ```

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use futures::future::BoxFuture;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::errors::{Error, Result};
use crate::providers::{BrokerageApi, ProviderError};

const REVIEW_COMPLETED: &str = "completed";
const REVIEW_PENDING: &str = "pending";
const ANSWER_GREEN: &str = "GREEN";
const ANSWER_RED: &str = "RED";

/// Verification state as far as the client is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KycStatus {
    Required,
    Pending,
    Failed,
    Verified,
}

impl KycStatus {
    /// Maps a review to a status, treating anything inconclusive as `Required`.
    pub fn from_review(review_status: Option<&str>, review_answer: Option<&str>) -> Self {
        Self::decisive(review_status, review_answer).unwrap_or(KycStatus::Required)
    }

    /// Maps a review to a status only when it is conclusive.
    ///
    /// A completed review with an unknown answer is not conclusive.
    pub fn decisive(review_status: Option<&str>, review_answer: Option<&str>) -> Option<Self> {
        match (review_status, review_answer) {
            (Some(REVIEW_COMPLETED), Some(ANSWER_GREEN)) => Some(KycStatus::Verified),
            (Some(REVIEW_COMPLETED), Some(ANSWER_RED)) => Some(KycStatus::Failed),
            (Some(REVIEW_PENDING), _) => Some(KycStatus::Pending),
            _ => None,
        }
    }

    /// Whether the SDK may be launched from this status.
    pub fn needs_verification(self) -> bool {
        matches!(self, KycStatus::Required | KycStatus::Failed)
    }
}

impl fmt::Display for KycStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KycStatus::Required => "required",
            KycStatus::Pending => "pending",
            KycStatus::Failed => "failed",
            KycStatus::Verified => "verified",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResult {
    #[serde(default)]
    pub review_answer: Option<String>,
    #[serde(default)]
    pub reject_labels: Vec<String>,
}

/// Applicant review as reported by the backend or the SDK.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantReview {
    #[serde(default)]
    pub review_status: Option<String>,
    #[serde(default)]
    pub review_result: Option<ReviewResult>,
}

impl ApplicantReview {
    pub fn answer(&self) -> Option<&str> {
        self.review_result
            .as_ref()
            .and_then(|r| r.review_answer.as_deref())
    }

    pub fn status(&self) -> KycStatus {
        KycStatus::from_review(self.review_status.as_deref(), self.answer())
    }

    pub fn reject_labels(&self) -> &[String] {
        self.review_result
            .as_ref()
            .map(|r| r.reject_labels.as_slice())
            .unwrap_or_default()
    }
}

/// Error reported by a [`VerificationSdk`] implementation.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SdkError(pub String);

/// Events emitted by a running SDK.
#[derive(Debug, Clone, PartialEq)]
pub enum SdkEvent {
    StepCompleted { step: String },
    Error { message: String },
    ApplicantStatus(ApplicantReview),
    /// Emitted once the SDK has fetched the applicant; may already be verified.
    ApplicantLoaded(ApplicantReview),
}

/// Fetches a fresh SDK access token when the current one expires.
pub type TokenRefresh =
    Arc<dyn Fn() -> BoxFuture<'static, std::result::Result<SecretString, ProviderError>> + Send + Sync>;

/// The identity-verification SDK, as an injected capability.
#[async_trait]
pub trait VerificationSdk: Send {
    /// Loads SDK resources. Called at most once per gate.
    async fn load(&mut self) -> std::result::Result<(), SdkError>;

    /// Starts verification with a short-lived access token.
    async fn launch(
        &mut self,
        access_token: SecretString,
        refresh: TokenRefresh,
    ) -> std::result::Result<(), SdkError>;

    /// Next event, or `None` once the SDK session has ended.
    async fn next_event(&mut self) -> Option<SdkEvent>;
}

/// Drives verification for one signed-in user.
pub struct KycGate<P, S> {
    provider: Arc<P>,
    sdk: S,
    status: Option<KycStatus>,
    review: Option<ApplicantReview>,
    sdk_loaded: bool,
    launched: bool,
}

impl<P, S> KycGate<P, S>
where
    P: BrokerageApi + 'static,
    S: VerificationSdk,
{
    pub fn new(provider: Arc<P>, sdk: S) -> Self {
        Self {
            provider,
            sdk,
            status: None,
            review: None,
            sdk_loaded: false,
            launched: false,
        }
    }

    /// `None` until [`check`](Self::check) has run.
    pub fn status(&self) -> Option<KycStatus> {
        self.status
    }

    /// Labels from the last rejected review, if any.
    pub fn reject_labels(&self) -> &[String] {
        self.review
            .as_ref()
            .map(ApplicantReview::reject_labels)
            .unwrap_or_default()
    }

    pub fn is_launched(&self) -> bool {
        self.launched
    }

    /// Asks the backend for the current review.
    ///
    /// Backend failures resolve to `Required` so the user can still verify.
    /// When verification is needed the SDK is loaded right away.
    pub async fn check(&mut self) -> KycStatus {
        let status = match self.provider.fetch_kyc_status().await {
            Ok(review) => {
                let status = review.status();
                self.review = Some(review);
                status
            }
            Err(e) => {
                warn!(error = %e, "failed to check verification status");
                KycStatus::Required
            }
        };
        info!(%status, "verification status checked");
        self.status = Some(status);

        if status.needs_verification() && !self.sdk_loaded {
            match self.sdk.load().await {
                Ok(()) => self.sdk_loaded = true,
                Err(e) => warn!(error = %e, "failed to load verification SDK"),
            }
        }
        status
    }

    /// Launches the SDK. Only valid from `Required` or `Failed`.
    pub async fn launch(&mut self) -> Result<()> {
        if self.launched {
            return Err(Error::AlreadyLaunched);
        }
        let status = self.status.unwrap_or(KycStatus::Required);
        if !status.needs_verification() {
            return Err(Error::VerificationNotRequired(status));
        }
        if !self.sdk_loaded {
            self.sdk.load().await?;
            self.sdk_loaded = true;
        }

        let token = self.provider.issue_kyc_token().await?;
        let provider = Arc::clone(&self.provider);
        let refresh: TokenRefresh = Arc::new(move || {
            let provider = Arc::clone(&provider);
            Box::pin(async move { provider.issue_kyc_token().await })
        });

        self.sdk.launch(token, refresh).await?;
        self.launched = true;
        info!("verification SDK launched");
        Ok(())
    }

    /// Applies one SDK event and returns the resulting status.
    pub fn apply(&mut self, event: SdkEvent) -> Option<KycStatus> {
        match event {
            SdkEvent::StepCompleted { step } => {
                debug!(%step, "verification step completed");
            }
            SdkEvent::Error { message } => {
                warn!(%message, "verification SDK reported an error");
            }
            SdkEvent::ApplicantStatus(review) => {
                if let Some(status) =
                    KycStatus::decisive(review.review_status.as_deref(), review.answer())
                {
                    self.status = Some(status);
                }
                self.review = Some(review);
            }
            SdkEvent::ApplicantLoaded(review) => {
                if review.status() == KycStatus::Verified {
                    self.status = Some(KycStatus::Verified);
                }
                self.review = Some(review);
            }
        }
        self.status
    }

    /// Consumes SDK events until verification is decided or the SDK stops.
    pub async fn run_until_settled(&mut self) -> Option<KycStatus> {
        while let Some(event) = self.sdk.next_event().await {
            if let Some(KycStatus::Verified | KycStatus::Failed) = self.apply(event) {
                break;
            }
        }
        self.status
    }
}
