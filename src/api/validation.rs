//! Validation error normalization
//!
//! The backend reports failures as
//! `{ "error": { code, message, statusCode, timestamp, path, correlationId, details? } }`
//! where `details` is a list of strings/objects or an object keyed by field.
//! The interceptor here flattens `details` into one ordered list of messages.

use crate::api::client::{ApiClient, ApiResponse, Attempt, ResponseInterceptor};
use crate::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

/// Used when `details` yields nothing readable
pub const FALLBACK_MESSAGE: &str = "An error occurred";

/// Raw error envelope as sent by the backend
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
    pub status_code: u16,
    #[serde(default, deserialize_with = "lenient_text")]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub path: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub details: Option<Value>,
}

/// Informational fields: `null` or a non-string value reads as absent
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        _ => None,
    })
}

/// Error data with `details` flattened
#[derive(Debug, Clone, PartialEq)]
pub struct ApiErrorData {
    pub code: String,
    pub message: String,
    pub status_code: u16,
    pub timestamp: Option<String>,
    pub path: Option<String>,
    pub correlation_id: Option<String>,
    pub details: Option<NormalizedDetails>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedDetails {
    /// `details` exactly as received
    pub raw: Value,
    /// Never empty
    pub messages: Vec<String>,
}

/// Try to read a validation envelope out of a response body
pub fn parse_envelope(body: &Value) -> Option<ApiErrorEnvelope> {
    serde_json::from_value(body.clone()).ok()
}

pub fn normalize_validation_errors(envelope: ApiErrorEnvelope) -> ApiErrorData {
    let ApiErrorBody {
        code,
        message,
        status_code,
        timestamp,
        path,
        correlation_id,
        details,
    } = envelope.error;

    ApiErrorData {
        code,
        message,
        status_code,
        timestamp,
        path,
        correlation_id,
        details: details.map(normalize_details),
    }
}

fn normalize_details(details: Value) -> NormalizedDetails {
    let mut messages = Vec::new();

    match &details {
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(message) => messages.push(message.clone()),
                    Value::Object(fields) => match fields.get("message").and_then(Value::as_str) {
                        Some(message) => messages.push(message.to_string()),
                        None => messages.push(item.to_string()),
                    },
                    Value::Array(_) => messages.push(item.to_string()),
                    _ => {}
                }
            }
        }
        Value::Object(fields) => {
            for (field, value) in fields {
                match value {
                    Value::Array(entries) => {
                        for entry in entries {
                            if let Value::String(message) = entry {
                                messages.push(format!("{} {}", field, message));
                            }
                        }
                    }
                    Value::String(message) => messages.push(format!("{} {}", field, message)),
                    Value::Number(number) => messages.push(format!("{} {}", field, number)),
                    other => messages.push(format!("{} {}", field, other)),
                }
            }
        }
        Value::String(message) => messages.push(message.clone()),
        other => messages.push(other.to_string()),
    }

    messages.retain(|message| !message.trim().is_empty());
    if messages.is_empty() {
        messages.push(FALLBACK_MESSAGE.to_string());
    }

    NormalizedDetails { raw: details, messages }
}

/// Attaches [`ApiErrorData`] to failures that carry a validation envelope.
///
/// Only enriches the error; a rejected attempt stays rejected.
pub struct ValidationErrorInterceptor;

#[async_trait]
impl ResponseInterceptor for ValidationErrorInterceptor {
    async fn on_rejected(
        &self,
        _client: &ApiClient,
        _attempt: &Attempt,
        error: AppError,
    ) -> Result<ApiResponse, AppError> {
        match error {
            AppError::Http(mut failure) if failure.normalized.is_none() => {
                if let Some(envelope) = parse_envelope(&failure.body) {
                    let data = normalize_validation_errors(envelope);
                    debug!(code = %data.code, path = %failure.path, "Normalized error response");
                    failure.normalized = Some(data);
                }
                Err(AppError::Http(failure))
            }
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::{ApiFailure, RequestConfig};
    use reqwest::Method;
    use serde_json::json;

    fn envelope(details: Value) -> ApiErrorEnvelope {
        parse_envelope(&json!({
            "error": {
                "code": "VALIDATION.FAILED",
                "message": "Validation failed",
                "statusCode": 422,
                "timestamp": "2024-01-01T00:00:00Z",
                "path": "/api/articles",
                "correlationId": "c-1",
                "details": details,
            }
        }))
        .expect("valid envelope")
    }

    fn messages(details: Value) -> Vec<String> {
        normalize_validation_errors(envelope(details))
            .details
            .expect("details present")
            .messages
    }

    #[test]
    fn test_array_of_strings_and_objects() {
        let result = messages(json!([
            "title must not be empty",
            {"field": "body", "message": "body is required"},
            {"field": "tags"},
            42
        ]));
        assert_eq!(
            result,
            vec![
                "title must not be empty".to_string(),
                "body is required".to_string(),
                "{\"field\":\"tags\"}".to_string(),
            ]
        );
    }

    #[test]
    fn test_field_keyed_object_keeps_server_order() {
        let result = messages(json!({
            "username": ["has already been taken", "is too short"],
            "email": "is invalid",
            "age": 3,
            "extra": {"nested": true}
        }));
        assert_eq!(
            result,
            vec![
                "username has already been taken".to_string(),
                "username is too short".to_string(),
                "email is invalid".to_string(),
                "age 3".to_string(),
                "extra {\"nested\":true}".to_string(),
            ]
        );
    }

    #[test]
    fn test_plain_string_and_scalar_details() {
        assert_eq!(messages(json!("slug is taken")), vec!["slug is taken".to_string()]);
        assert_eq!(messages(json!(true)), vec!["true".to_string()]);
    }

    #[test]
    fn test_empty_details_fall_back() {
        assert_eq!(messages(json!([])), vec![FALLBACK_MESSAGE.to_string()]);
        assert_eq!(messages(json!({})), vec![FALLBACK_MESSAGE.to_string()]);
        assert_eq!(messages(json!([1, 2, null])), vec![FALLBACK_MESSAGE.to_string()]);
        assert_eq!(messages(json!({"title": []})), vec![FALLBACK_MESSAGE.to_string()]);
        assert_eq!(messages(json!("")), vec![FALLBACK_MESSAGE.to_string()]);
    }

    #[test]
    fn test_missing_details_stay_absent() {
        let data = normalize_validation_errors(
            parse_envelope(&json!({
                "error": {"code": "NOT_FOUND", "message": "Article not found", "statusCode": 404}
            }))
            .expect("valid envelope"),
        );
        assert_eq!(data.details, None);
        assert_eq!(data.message, "Article not found");
    }

    #[test]
    fn test_null_informational_fields_still_normalize() {
        let body = json!({
            "error": {
                "code": "VALIDATION.FAILED",
                "message": "Validation failed",
                "statusCode": 422,
                "timestamp": null,
                "path": 17,
                "correlationId": null,
                "details": {"title": ["can't be blank"]}
            }
        });
        let data = normalize_validation_errors(parse_envelope(&body).expect("valid envelope"));
        assert_eq!(data.timestamp, None);
        assert_eq!(data.path, None);
        assert_eq!(data.correlation_id, None);
        assert_eq!(data.details.expect("details").messages, vec!["title can't be blank".to_string()]);
    }

    #[test]
    fn test_non_envelope_is_rejected() {
        assert!(parse_envelope(&json!({"errors": {"body": ["can't be empty"]}})).is_none());
        assert!(parse_envelope(&json!("Bad Gateway")).is_none());
        assert!(parse_envelope(&Value::Null).is_none());
    }

    #[tokio::test]
    async fn test_interceptor_enriches_and_keeps_rejection() {
        let client = ApiClient::new(reqwest::Client::new(), "http://localhost");
        let attempt = Attempt::new(RequestConfig::post("/articles"));
        let body = json!({
            "error": {
                "code": "VALIDATION.FAILED",
                "message": "Validation failed",
                "statusCode": 422,
                "details": {"title": ["can't be blank"]}
            }
        });
        let error = AppError::Http(ApiFailure::new(Method::POST, "/articles", 422, body.clone()));

        let result = ValidationErrorInterceptor
            .on_rejected(&client, &attempt, error)
            .await;

        match result {
            Err(AppError::Http(failure)) => {
                assert_eq!(failure.body, body, "raw body must be kept");
                assert_eq!(failure.messages(), vec!["title can't be blank".to_string()]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_interceptor_passes_through_unrecognized_payloads() {
        let client = ApiClient::new(reqwest::Client::new(), "http://localhost");
        let attempt = Attempt::new(RequestConfig::get("/tags"));
        let error = AppError::Http(ApiFailure::new(Method::GET, "/tags", 500, json!("boom")));

        match ValidationErrorInterceptor.on_rejected(&client, &attempt, error).await {
            Err(AppError::Http(failure)) => assert!(failure.normalized.is_none()),
            other => panic!("unexpected result: {:?}", other),
        }

        let network = AppError::Network("refused".to_string());
        match ValidationErrorInterceptor.on_rejected(&client, &attempt, network).await {
            Err(AppError::Network(message)) => assert_eq!(message, "refused"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
