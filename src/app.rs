//! Wiring of clients, interceptors, session store and token manager

use crate::api::client::ApiClient;
use crate::api::service::ConduitApi;
use crate::api::validation::ValidationErrorInterceptor;
use crate::auth::interceptor::{AuthRequestInterceptor, AuthResponseInterceptor};
use crate::auth::navigator::{CliNavigator, Navigator};
use crate::auth::refresh::HttpTokenRefresher;
use crate::auth::token_manager::TokenManager;
use crate::config::{self, Config};
use crate::error::AppError;
use crate::http::{client_with_timeout, PersistentCookieJar};
use crate::session::{PersistentSessionStore, Session, SessionRepository};
use std::sync::Arc;
use tracing::{debug, info};

/// A ready-to-use Conduit client
pub struct Conduit {
    api: ConduitApi,
    tokens: Arc<TokenManager>,
    sessions: Arc<dyn SessionRepository>,
    navigator: Arc<CliNavigator>,
    jar: Arc<PersistentCookieJar>,
}

impl Conduit {
    /// Connect using the session and cookies persisted in the config directory
    pub fn connect(config: &Config) -> Result<Self, AppError> {
        let session_path = config::session_path().map_err(|e| AppError::Config(e.to_string()))?;
        let cookies_path = config::cookies_path().map_err(|e| AppError::Config(e.to_string()))?;

        let sessions = Arc::new(PersistentSessionStore::open(config.session_backend, session_path)?);
        let jar = Arc::new(PersistentCookieJar::load(cookies_path));
        Self::with_parts(config, sessions, jar, Arc::new(CliNavigator::new()))
    }

    /// Build from explicit parts
    ///
    /// The authenticated client runs: bearer injection, then 401 recovery,
    /// then validation normalization. The refresh call goes through its own
    /// client so that a rejected refresh is judged once, by the token manager.
    pub fn with_parts(
        config: &Config,
        sessions: Arc<dyn SessionRepository>,
        jar: Arc<PersistentCookieJar>,
        navigator: Arc<CliNavigator>,
    ) -> Result<Self, AppError> {
        let timeout = config.timeout();
        let with_cookies = client_with_timeout(timeout, Some(Arc::clone(&jar)))?;
        let anonymous = client_with_timeout(timeout, None)?;

        let tokens = Arc::new(TokenManager::new(
            Arc::clone(&sessions),
            Arc::clone(&navigator) as Arc<dyn Navigator>,
            timeout,
        ));
        let bearer = Arc::new(AuthRequestInterceptor::new(Arc::clone(&sessions)));
        let validation = Arc::new(ValidationErrorInterceptor);

        let refresher = ApiClient::new(with_cookies.clone(), config.api_url.clone())
            .with_request_interceptor(bearer.clone())
            .with_response_interceptor(validation.clone());
        tokens.initialize(Arc::new(HttpTokenRefresher::new(refresher)));

        let private = ApiClient::new(with_cookies, config.api_url.clone())
            .with_request_interceptor(bearer)
            .with_response_interceptor(Arc::new(AuthResponseInterceptor::new(Arc::clone(&tokens))))
            .with_response_interceptor(validation.clone());
        let public = ApiClient::new(anonymous, config.api_url.clone()).with_response_interceptor(validation);

        debug!(api_url = %config.api_url, timeout_secs = timeout.as_secs(), "Client configured");
        Ok(Self {
            api: ConduitApi::new(private, public, Arc::clone(&sessions)),
            tokens,
            sessions,
            navigator,
            jar,
        })
    }

    pub fn api(&self) -> &ConduitApi {
        &self.api
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    pub fn navigator(&self) -> &CliNavigator {
        &self.navigator
    }

    pub fn session(&self) -> Option<Session> {
        self.sessions.current()
    }

    pub fn jar(&self) -> &PersistentCookieJar {
        &self.jar
    }

    /// End the session locally: forget the user and the refresh cookie
    pub fn logout(&self) -> Result<(), AppError> {
        info!("Logging out");
        self.jar.clear();
        self.sessions.clear()
    }
}
