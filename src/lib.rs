//! Client for the RealWorld "Conduit" API
//!
//! Requests go through an [`api::ApiClient`] whose interceptors attach the
//! session's bearer token, recover from expired access tokens with a single
//! shared refresh, and flatten validation errors into readable messages.

pub mod api;
pub mod app;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod http;
pub mod permission;
pub mod routes;
pub mod session;

pub use app::Conduit;
pub use error::AppError;
