//! HTTP client with ordered request/response interceptor chains
//!
//! Every call is an [`Attempt`]: a [`RequestConfig`] plus the retry state of the
//! logical request. Request interceptors rewrite the config before it goes on
//! the wire; response interceptors see failures in registration order and may
//! resolve them (for example by replaying the attempt through [`ApiClient::send`]).

use crate::api::validation::ApiErrorData;
use crate::error::AppError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Description of a single outgoing request
#[derive(Debug, Clone, PartialEq)]
pub struct RequestConfig {
    pub method: Method,
    /// Path relative to the client's base URL
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Bearer token sent as `Authorization: Bearer <token>`
    pub bearer: Option<String>,
    /// Per-request override of the client timeout
    pub timeout: Option<Duration>,
}

impl RequestConfig {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
            timeout: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body
    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self, AppError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn query_pairs(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query = pairs;
        self
    }

    pub fn set_bearer(&mut self, token: &str) {
        self.bearer = Some(token.to_string());
    }

    /// Value of the Authorization header this request will carry
    pub fn authorization(&self) -> Option<String> {
        self.bearer.as_ref().map(|token| format!("Bearer {}", token))
    }
}

/// Retry state of one logical request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// First trip to the server
    Initial,
    /// Already replayed once after a token refresh; never retried again
    Retried,
}

/// A request config travelling with its retry state
#[derive(Debug, Clone)]
pub struct Attempt {
    pub config: RequestConfig,
    pub retry: RetryState,
}

impl Attempt {
    pub fn new(config: RequestConfig) -> Self {
        Self { config, retry: RetryState::Initial }
    }

    pub fn retried(config: RequestConfig) -> Self {
        Self { config, retry: RetryState::Retried }
    }

    pub fn is_retried(&self) -> bool {
        self.retry == RetryState::Retried
    }
}

/// Successful response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    /// Parsed JSON body, `Value::Null` when the body was empty
    pub body: Value,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(self) -> Result<T, AppError> {
        serde_json::from_value(self.body)
            .map_err(|e| AppError::Parse(format!("Failed to parse response: {}", e)))
    }
}

/// A request the server answered with a non-success status
#[derive(Debug, Clone, PartialEq)]
pub struct ApiFailure {
    pub method: Method,
    pub path: String,
    pub status: u16,
    /// Raw response body (JSON, or a JSON string when the body was not JSON)
    pub body: Value,
    /// Validation envelope flattened by the validation interceptor
    pub normalized: Option<ApiErrorData>,
}

impl ApiFailure {
    pub fn new(method: Method, path: impl Into<String>, status: u16, body: Value) -> Self {
        Self {
            method,
            path: path.into(),
            status,
            body,
            normalized: None,
        }
    }

    /// Messages suitable for showing to a user
    pub fn messages(&self) -> Vec<String> {
        if let Some(data) = &self.normalized {
            if let Some(details) = &data.details {
                return details.messages.clone();
            }
            return vec![data.message.clone()];
        }
        match self.body.pointer("/error/message").and_then(Value::as_str) {
            Some(message) => vec![message.to_string()],
            None => vec![self.to_string()],
        }
    }
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} failed with status {}", self.method, self.path, self.status)?;
        if let Some(data) = &self.normalized {
            write!(f, ": {}", data.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiFailure {}

/// Rewrites a request before it is sent. Never suspends.
pub trait RequestInterceptor: Send + Sync {
    fn on_request(&self, config: &mut RequestConfig);
}

/// Sees every failed attempt, in registration order
#[async_trait]
pub trait ResponseInterceptor: Send + Sync {
    async fn on_rejected(
        &self,
        client: &ApiClient,
        attempt: &Attempt,
        error: AppError,
    ) -> Result<ApiResponse, AppError>;
}

/// reqwest-backed client with interceptor chains
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
    response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
}

impl ApiClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_interceptors: Vec::new(),
            response_interceptors: Vec::new(),
        }
    }

    pub fn with_request_interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.request_interceptors.push(interceptor);
        self
    }

    pub fn with_response_interceptor(mut self, interceptor: Arc<dyn ResponseInterceptor>) -> Self {
        self.response_interceptors.push(interceptor);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a request and decode the JSON response
    pub async fn request<T: DeserializeOwned>(&self, config: RequestConfig) -> Result<T, AppError> {
        self.send(Attempt::new(config)).await?.json()
    }

    /// Issue a request whose response body is ignored
    pub async fn request_empty(&self, config: RequestConfig) -> Result<(), AppError> {
        self.send(Attempt::new(config)).await.map(|_| ())
    }

    /// Run an attempt through both interceptor chains
    pub fn send(&self, attempt: Attempt) -> BoxFuture<'_, Result<ApiResponse, AppError>> {
        async move {
            let mut attempt = attempt;
            for interceptor in &self.request_interceptors {
                interceptor.on_request(&mut attempt.config);
            }

            let mut outcome = self.execute(&attempt.config).await;
            for interceptor in &self.response_interceptors {
                outcome = match outcome {
                    Ok(response) => Ok(response),
                    Err(error) => interceptor.on_rejected(self, &attempt, error).await,
                };
            }
            outcome
        }
        .boxed()
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn execute(&self, config: &RequestConfig) -> Result<ApiResponse, AppError> {
        let url = self.url_for(&config.path);
        debug!(method = %config.method, %url, authenticated = config.bearer.is_some(), "Sending request");

        let mut request = self.http.request(config.method.clone(), &url);
        if !config.query.is_empty() {
            request = request.query(&config.query);
        }
        if let Some(body) = &config.body {
            request = request.json(body);
        }
        if let Some(token) = &config.bearer {
            request = request.bearer_auth(token);
        }
        if let Some(timeout) = config.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let body = parse_body(&text);

        if status.is_success() {
            Ok(ApiResponse { status: status.as_u16(), body })
        } else {
            debug!(%url, status = status.as_u16(), "Request failed");
            Err(AppError::Http(ApiFailure::new(
                config.method.clone(),
                config.path.clone(),
                status.as_u16(),
                body,
            )))
        }
    }
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
