pub mod client;
pub mod endpoints;
pub mod schemas;
pub mod service;
pub mod validation;

#[cfg(test)]
mod client_tests;

pub use client::{ApiClient, ApiFailure, ApiResponse, Attempt, RequestConfig, RequestInterceptor, ResponseInterceptor, RetryState};
pub use service::ConduitApi;
pub use validation::{normalize_validation_errors, ApiErrorData, ValidationErrorInterceptor};
