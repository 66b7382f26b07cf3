//! Error types and handling for the Conduit client

use crate::api::client::ApiFailure;
use crate::auth::RefreshError;
use thiserror::Error;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    /// The server answered with a non-success status
    #[error("{0}")]
    Http(ApiFailure),

    #[error("Token refresh failed: {0}")]
    Refresh(RefreshError),

    /// The token manager was used before a refresh function was injected
    #[error("Token manager not initialized: {0}")]
    Uninitialized(&'static str),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Session storage error: {0}")]
    Session(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get a stable machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "invalid_input",
            AppError::Network(_) => "network_error",
            AppError::NotFound(_) => "not_found",
            AppError::Timeout(_) => "timeout",
            AppError::Http(failure) if failure.status == 404 => "not_found",
            AppError::Http(failure) if failure.status == 401 => "unauthorized",
            AppError::Http(_) => "http_error",
            AppError::Refresh(_) => "refresh_failed",
            AppError::Uninitialized(_) => "uninitialized",
            AppError::PermissionDenied(_) => "permission_denied",
            AppError::Session(_) => "session_error",
            AppError::Config(_) => "config_error",
            AppError::Parse(_) => "parse_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// Get the error message
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Human-readable messages, preferring normalized validation details
    pub fn messages(&self) -> Vec<String> {
        match self {
            AppError::Http(failure) => failure.messages(),
            AppError::Refresh(RefreshError::Rejected(failure)) => failure.messages(),
            other => vec![other.to_string()],
        }
    }

    /// Process exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::InvalidInput(_) | AppError::Config(_) => 1,
            AppError::Http(failure) if failure.status == 400 || failure.status == 422 => 1,
            AppError::Network(_) => 2,
            AppError::NotFound(_) => 3,
            AppError::Http(failure) if failure.status == 404 => 3,
            AppError::Timeout(_) => 4,
            AppError::Http(failure) if failure.status == 401 || failure.status == 403 => 5,
            AppError::Refresh(_) | AppError::PermissionDenied(_) | AppError::Session(_) => 5,
            AppError::Http(_) => 2,
            AppError::Uninitialized(_) | AppError::Parse(_) | AppError::Internal(_) => 6,
        }
    }

    /// Whether the error came back as an HTTP 401
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AppError::Http(failure) if failure.status == 401)
    }
}

impl From<RefreshError> for AppError {
    fn from(err: RefreshError) -> Self {
        AppError::Refresh(err)
    }
}

/// Convert reqwest::Error to AppError
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout(err.to_string())
        } else if err.is_connect() || err.is_request() {
            AppError::Network(err.to_string())
        } else if err.is_decode() {
            AppError::Parse(err.to_string())
        } else {
            AppError::Internal(err.to_string())
        }
    }
}

/// Convert serde_json::Error to AppError
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(err.to_string())
    }
}

/// Convert std::io::Error to AppError
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Session(err.to_string())
    }
}

/// Reject empty required fields before any request is made
pub fn require_non_empty(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidInput(format!("{} cannot be empty", field)));
    }
    Ok(())
}
