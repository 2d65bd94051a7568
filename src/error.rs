//! # Error Handling
//!
//! Defines the application error type and how it is converted to HTTP
//! responses. Errors are carried as a `Result` through the orchestration
//! layer and translated to a transport status code only at the request
//! boundary.
//!
//! ## HTTP Status Code Mapping:
//! - BadRequest → 400 (short/empty audio, failed transcription, missing
//!   dictation state)
//! - Unauthorized → 401 (unauthenticated access to a protected endpoint)
//! - Upstream → 500 (chat completion or non-degradable synthesis failure)
//! - Internal → 500 (unexpected failures)
//!
//! No store mutation happens on any error path; handlers return the error
//! before touching per-session state.

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

/// Application error kinds, one per failure class the service can surface.
#[derive(Debug)]
pub enum AppError {
    /// Client sent invalid data (audio too short, malformed form, or a
    /// dictation step without a started dictation)
    BadRequest(String),

    /// Caller is not authenticated against the operator credential
    Unauthorized(String),

    /// An upstream model service failed in a way the turn cannot absorb
    Upstream(String),

    /// Unexpected server-side failures
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Upstream(msg) => write!(f, "Upstream error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

/// Converts errors into the JSON envelope every endpoint uses:
///
/// ```json
/// {
///   "error": {
///     "type": "bad_request",
///     "message": "Audio too short/empty.",
///     "timestamp": "2025-01-01T12:00:00Z"
///   }
/// }
/// ```
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, error_type, message) = match self {
            AppError::BadRequest(msg) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "bad_request",
                msg.clone(),
            ),
            AppError::Unauthorized(msg) => (
                actix_web::http::StatusCode::UNAUTHORIZED,
                "unauthorized",
                msg.clone(),
            ),
            AppError::Upstream(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "upstream_error",
                msg.clone(),
            ),
            AppError::Internal(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                msg.clone(),
            ),
        };

        HttpResponse::build(status).json(json!({
            "error": {
                "type": error_type,
                "message": message,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        }))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// JSON parsing problems are client mistakes, not server faults.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

/// Shorthand for `Result<T, AppError>` used throughout the handlers and
/// the orchestration layer.
pub type AppResult<T> = Result<T, AppError>;
