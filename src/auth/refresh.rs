//! The refresh function injected into the token manager

use crate::api::client::{ApiClient, ApiFailure, RequestConfig};
use crate::api::endpoints;
use crate::api::schemas::RefreshResponseDto;
use crate::error::AppError;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Result of a successful refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshResponse {
    pub token: String,
}

/// Why a refresh did not produce a token.
///
/// `Clone` so a single failure can be handed to every queued request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RefreshError {
    /// The refresh endpoint answered with an error status
    #[error("refresh rejected: {0}")]
    Rejected(ApiFailure),

    #[error("refresh request failed: {0}")]
    Transport(String),

    #[error("refresh timed out after {0:?}")]
    TimedOut(Duration),

    /// The refresh task ended without an outcome
    #[error("refresh aborted")]
    Aborted,
}

impl RefreshError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, RefreshError::Rejected(failure) if failure.status == 401)
    }
}

impl From<AppError> for RefreshError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Http(failure) => RefreshError::Rejected(failure),
            AppError::Refresh(inner) => inner,
            other => RefreshError::Transport(other.to_string()),
        }
    }
}

/// Exchanges the out-of-band refresh credential for a new access token
#[async_trait]
pub trait RefreshTokenFn: Send + Sync {
    async fn refresh(&self) -> Result<RefreshResponse, RefreshError>;
}

#[async_trait]
impl<F, Fut> RefreshTokenFn for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<RefreshResponse, RefreshError>> + Send + 'static,
{
    async fn refresh(&self) -> Result<RefreshResponse, RefreshError> {
        (self)().await
    }
}

/// Calls `POST /users/refresh`; the refresh token travels as a cookie
pub struct HttpTokenRefresher {
    client: ApiClient,
}

impl HttpTokenRefresher {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RefreshTokenFn for HttpTokenRefresher {
    async fn refresh(&self) -> Result<RefreshResponse, RefreshError> {
        let dto: RefreshResponseDto = self
            .client
            .request(RequestConfig::post(endpoints::REFRESH))
            .await?;
        Ok(RefreshResponse { token: dto.user.token })
    }
}
