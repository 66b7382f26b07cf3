//! Bearer token injection and 401 recovery for the authenticated client

use crate::api::client::{ApiClient, ApiFailure, ApiResponse, Attempt, RequestConfig, RequestInterceptor, ResponseInterceptor};
use crate::api::endpoints;
use crate::auth::error::{parse_auth_error, should_logout};
use crate::auth::token_manager::TokenManager;
use crate::error::AppError;
use crate::session::SessionRepository;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Adds `Authorization: Bearer <token>` when a session is present
pub struct AuthRequestInterceptor {
    sessions: Arc<dyn SessionRepository>,
}

impl AuthRequestInterceptor {
    pub fn new(sessions: Arc<dyn SessionRepository>) -> Self {
        Self { sessions }
    }
}

impl RequestInterceptor for AuthRequestInterceptor {
    fn on_request(&self, config: &mut RequestConfig) {
        if let Some(token) = self.sessions.token() {
            debug!(path = %config.path, "Attaching bearer token");
            config.set_bearer(&token);
        }
    }
}

/// Recovers requests rejected with 401 by refreshing the access token and
/// replaying them once
pub struct AuthResponseInterceptor {
    tokens: Arc<TokenManager>,
}

impl AuthResponseInterceptor {
    pub fn new(tokens: Arc<TokenManager>) -> Self {
        Self { tokens }
    }

    fn refresh_endpoint_rejected(&self, failure: &ApiFailure) {
        let auth_error = parse_auth_error(failure);
        if should_logout(auth_error.as_ref()) {
            self.tokens.handle_logout(auth_error.as_ref());
        }
    }
}

#[async_trait]
impl ResponseInterceptor for AuthResponseInterceptor {
    async fn on_rejected(
        &self,
        client: &ApiClient,
        attempt: &Attempt,
        error: AppError,
    ) -> Result<ApiResponse, AppError> {
        let failure = match error {
            AppError::Http(failure) if failure.status == 401 => failure,
            other => return Err(other),
        };

        // Wrong credentials, not a token problem
        if endpoints::is_credential_exchange(&attempt.config.path) {
            return Err(AppError::Http(failure));
        }

        if endpoints::is_refresh(&attempt.config.path) {
            self.refresh_endpoint_rejected(&failure);
            return Err(AppError::Http(failure));
        }

        if attempt.is_retried() {
            warn!(path = %attempt.config.path, "Request rejected again after token refresh, not retrying");
            return Err(AppError::Http(failure));
        }

        let updated = self
            .tokens
            .handle_401_error(&failure, attempt.config.clone())
            .await?;
        debug!(path = %updated.path, "Replaying request with refreshed token");
        client.send(Attempt::retried(updated)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::types::test_session;
    use crate::session::MemorySessionStore;

    #[test]
    fn test_request_interceptor_sets_bearer() {
        let sessions = Arc::new(MemorySessionStore::with_session(test_session("abc")));
        let interceptor = AuthRequestInterceptor::new(sessions);
        let mut config = RequestConfig::get("/user");
        interceptor.on_request(&mut config);
        assert_eq!(config.authorization().as_deref(), Some("Bearer abc"));
    }

    #[test]
    fn test_request_interceptor_leaves_anonymous_requests() {
        let interceptor = AuthRequestInterceptor::new(Arc::new(MemorySessionStore::new()));
        let mut config = RequestConfig::get("/tags");
        interceptor.on_request(&mut config);
        assert_eq!(config.bearer, None);

        let interceptor = AuthRequestInterceptor::new(Arc::new(MemorySessionStore::with_session(test_session(""))));
        interceptor.on_request(&mut config);
        assert_eq!(config.bearer, None);
    }
}
