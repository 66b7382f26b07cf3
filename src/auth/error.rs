//! Classification of server-reported authentication failures

use crate::api::client::ApiFailure;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Closed set of authentication error codes the backend reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum AuthErrorCode {
    #[serde(rename = "AUTH.TOKEN_EXPIRED", alias = "TOKEN_EXPIRED")]
    TokenExpired,
    #[serde(rename = "AUTH.TOKEN_INVALID", alias = "TOKEN_INVALID")]
    TokenInvalid,
    #[serde(rename = "AUTH.TOKEN_NOT_FOUND", alias = "TOKEN_NOT_FOUND")]
    TokenNotFound,
    #[serde(rename = "AUTH.REFRESH_TOKEN_REVOKED", alias = "REFRESH_TOKEN_REVOKED")]
    RefreshTokenRevoked,
    #[serde(rename = "AUTH.INVALID_CREDENTIALS", alias = "INVALID_CREDENTIALS")]
    InvalidCredentials,
}

impl AuthErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthErrorCode::TokenExpired => "AUTH.TOKEN_EXPIRED",
            AuthErrorCode::TokenInvalid => "AUTH.TOKEN_INVALID",
            AuthErrorCode::TokenNotFound => "AUTH.TOKEN_NOT_FOUND",
            AuthErrorCode::RefreshTokenRevoked => "AUTH.REFRESH_TOKEN_REVOKED",
            AuthErrorCode::InvalidCredentials => "AUTH.INVALID_CREDENTIALS",
        }
    }
}

impl fmt::Display for AuthErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which credential a token error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthErrorDetails {
    pub token_type: Option<TokenType>,
    pub expired_at: Option<String>,
    pub jti: Option<String>,
}

impl AuthErrorDetails {
    fn from_value(details: &Value) -> Option<Self> {
        let details = details.as_object()?;
        Some(Self {
            token_type: details
                .get("tokenType")
                .filter(|value| value.is_string())
                .and_then(|value| TokenType::deserialize(value).ok()),
            expired_at: details.get("expiredAt").and_then(text),
            jti: details.get("jti").and_then(text),
        })
    }
}

/// Typed view of a server-reported authentication failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Auth error {code}")]
pub struct AuthError {
    pub code: AuthErrorCode,
    /// 0 when the payload carries no usable status
    pub status_code: u16,
    pub timestamp: Option<String>,
    pub path: Option<String>,
    pub correlation_id: Option<String>,
    pub details: Option<AuthErrorDetails>,
}

impl AuthError {
    pub fn token_type(&self) -> Option<TokenType> {
        self.details.as_ref().and_then(|details| details.token_type)
    }

    pub fn is_token_expired(&self) -> bool {
        self.code == AuthErrorCode::TokenExpired
    }

    pub fn is_token_invalid(&self) -> bool {
        self.code == AuthErrorCode::TokenInvalid
    }

    pub fn is_refresh_token_revoked(&self) -> bool {
        self.code == AuthErrorCode::RefreshTokenRevoked
    }

    /// Only failures of the refresh credential itself end the session
    pub fn requires_logout(&self) -> bool {
        match self.code {
            AuthErrorCode::RefreshTokenRevoked | AuthErrorCode::TokenInvalid => true,
            AuthErrorCode::TokenExpired => self.token_type() == Some(TokenType::Refresh),
            AuthErrorCode::TokenNotFound | AuthErrorCode::InvalidCredentials => false,
        }
    }
}

/// Read an [`AuthError`] from `{ "error": { "code": ..., ... } }`.
///
/// Returns `None` when the body has no such object or the code is not an
/// authentication code; the failure is then not an auth-domain error. The
/// remaining fields are informational, so a `null` or oddly typed value
/// leaves that field empty instead of rejecting the payload.
pub fn parse_auth_error(failure: &ApiFailure) -> Option<AuthError> {
    let error = failure.body.get("error")?.as_object()?;
    let code = error
        .get("code")
        .filter(|code| code.is_string())
        .and_then(|code| AuthErrorCode::deserialize(code).ok())?;

    Some(AuthError {
        code,
        status_code: error.get("statusCode").and_then(status).unwrap_or(0),
        timestamp: error.get("timestamp").and_then(text),
        path: error.get("path").and_then(text),
        correlation_id: error.get("correlationId").and_then(text),
        details: error.get("details").and_then(AuthErrorDetails::from_value),
    })
}

/// Strings as-is, numbers in their JSON form (e.g. epoch seconds)
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn status(value: &Value) -> Option<u16> {
    match value {
        Value::Number(number) => number.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

pub fn should_logout(error: Option<&AuthError>) -> bool {
    error.map(AuthError::requires_logout).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;
    use serde_json::{json, Value};

    fn failure(body: Value) -> ApiFailure {
        ApiFailure::new(Method::GET, "/user", 401, body)
    }

    fn auth_error(code: &str, token_type: Option<&str>) -> Option<AuthError> {
        let mut error = json!({
            "code": code,
            "statusCode": 401,
            "timestamp": "2024-05-01T10:00:00Z",
            "path": "/api/user",
            "correlationId": "corr-1",
        });
        if let Some(token_type) = token_type {
            error["details"] = json!({"tokenType": token_type, "jti": "jti-1"});
        }
        parse_auth_error(&failure(json!({ "error": error })))
    }

    #[test]
    fn test_parse_full_payload() {
        let body = json!({
            "error": {
                "code": "AUTH.TOKEN_EXPIRED",
                "message": "Token expired",
                "statusCode": 401,
                "timestamp": "2024-05-01T10:00:00Z",
                "path": "/api/articles",
                "correlationId": "abc-123",
                "details": {"tokenType": "access", "expiredAt": "2024-05-01T09:59:00Z", "jti": "j-9"}
            }
        });
        let error = parse_auth_error(&failure(body)).expect("auth error");
        assert_eq!(error.code, AuthErrorCode::TokenExpired);
        assert_eq!(error.status_code, 401);
        assert_eq!(error.path.as_deref(), Some("/api/articles"));
        assert_eq!(error.correlation_id.as_deref(), Some("abc-123"));
        let details = error.details.expect("details");
        assert_eq!(details.token_type, Some(TokenType::Access));
        assert_eq!(details.expired_at.as_deref(), Some("2024-05-01T09:59:00Z"));
        assert_eq!(details.jti.as_deref(), Some("j-9"));
    }

    #[test]
    fn test_null_fields_do_not_hide_the_code() {
        let body = json!({
            "error": {
                "code": "AUTH.TOKEN_INVALID",
                "statusCode": 401,
                "timestamp": "t",
                "path": "/api/user",
                "correlationId": null
            }
        });
        let error = parse_auth_error(&failure(body)).expect("auth error");
        assert_eq!(error.code, AuthErrorCode::TokenInvalid);
        assert_eq!(error.correlation_id, None);
        assert!(should_logout(Some(&error)));
    }

    #[test]
    fn test_numeric_expiry_still_classifies_refresh_expiry() {
        let body = json!({
            "error": {
                "code": "AUTH.TOKEN_EXPIRED",
                "details": {"tokenType": "refresh", "expiredAt": 1714557600}
            }
        });
        let error = parse_auth_error(&failure(body)).expect("auth error");
        assert_eq!(error.status_code, 0);
        assert_eq!(error.token_type(), Some(TokenType::Refresh));
        let details = error.details.as_ref().expect("details");
        assert_eq!(details.expired_at.as_deref(), Some("1714557600"));
        assert!(should_logout(Some(&error)));
    }

    #[test]
    fn test_mistyped_optional_fields_are_dropped() {
        let body = json!({
            "error": {
                "code": "AUTH.TOKEN_EXPIRED",
                "statusCode": "401",
                "timestamp": {"at": 1},
                "path": null,
                "correlationId": ["c"],
                "details": {"tokenType": null, "expiredAt": false, "jti": 7}
            }
        });
        let error = parse_auth_error(&failure(body)).expect("auth error");
        assert_eq!(error.status_code, 401);
        assert_eq!(error.timestamp, None);
        assert_eq!(error.path, None);
        assert_eq!(error.correlation_id, None);
        assert_eq!(
            error.details,
            Some(AuthErrorDetails {
                token_type: None,
                expired_at: None,
                jti: Some("7".to_string()),
            })
        );
        assert!(!should_logout(Some(&error)));

        let string_details = json!({"error": {"code": "AUTH.TOKEN_EXPIRED", "details": "refresh"}});
        let error = parse_auth_error(&failure(string_details)).expect("auth error");
        assert_eq!(error.details, None);
    }

    #[test]
    fn test_bare_code_names_are_accepted() {
        let error = auth_error("REFRESH_TOKEN_REVOKED", None).expect("auth error");
        assert_eq!(error.code, AuthErrorCode::RefreshTokenRevoked);
    }

    #[test]
    fn test_unknown_codes_are_not_auth_errors() {
        assert!(auth_error("VALIDATION.FAILED", None).is_none());
        assert!(auth_error("AUTH.SOMETHING_ELSE", None).is_none());
    }

    #[test]
    fn test_unrecognized_shapes_are_not_auth_errors() {
        assert!(parse_auth_error(&failure(Value::Null)).is_none());
        assert!(parse_auth_error(&failure(json!("Unauthorized"))).is_none());
        assert!(parse_auth_error(&failure(json!({"error": "Unauthorized"}))).is_none());
        assert!(parse_auth_error(&failure(json!({"error": {"message": "no code"}}))).is_none());
        assert!(parse_auth_error(&failure(json!({"error": {"code": 401}}))).is_none());
    }

    #[test]
    fn test_should_logout_table() {
        let cases = [
            ("AUTH.REFRESH_TOKEN_REVOKED", None, true),
            ("AUTH.REFRESH_TOKEN_REVOKED", Some("access"), true),
            ("AUTH.TOKEN_INVALID", None, true),
            ("AUTH.TOKEN_INVALID", Some("refresh"), true),
            ("AUTH.TOKEN_EXPIRED", Some("refresh"), true),
            ("AUTH.TOKEN_EXPIRED", Some("access"), false),
            ("AUTH.TOKEN_EXPIRED", None, false),
            ("AUTH.TOKEN_EXPIRED", Some("session"), false),
            ("AUTH.TOKEN_NOT_FOUND", None, false),
            ("AUTH.TOKEN_NOT_FOUND", Some("refresh"), false),
            ("AUTH.INVALID_CREDENTIALS", None, false),
            ("AUTH.INVALID_CREDENTIALS", Some("refresh"), false),
        ];

        for (code, token_type, expected) in cases {
            let error = auth_error(code, token_type);
            assert!(error.is_some(), "{} should parse", code);
            assert_eq!(
                should_logout(error.as_ref()),
                expected,
                "code={} token_type={:?}",
                code,
                token_type
            );
        }
    }

    #[test]
    fn test_should_logout_without_auth_error() {
        assert!(!should_logout(None));
    }
}
