//! # Error Handling
//!
//! The application-wide error type and its conversion into HTTP responses.
//!
//! ## Response body
//! ```json
//! { "error": "human readable message", "code": "machine_readable_code" }
//! ```
//!
//! Ceremony failures never echo client-supplied bytes back. Security-fatal
//! ceremony failures (bad signature, counter regression) are logged on
//! their own target and reported only as `authentication_failed`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::webauthn::error::CeremonyError;

/// Log target for failures that may indicate a compromised credential
pub const SECURITY_LOG_TARGET: &str = "passkey::security";

/// Application-wide error type
///
/// `#[from]` lets `?` convert sqlx and ceremony errors automatically.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database errors (SQLx library errors)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A registration or authentication ceremony was rejected
    #[error("Ceremony failed: {0}")]
    Ceremony(#[from] CeremonyError),

    /// Resource not found errors (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request errors (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Authentication/authorization errors (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Internal server errors (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Database(e) => {
                // Log detailed error for debugging (not shown to user)
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", "Database error".to_string())
            }
            AppError::Ceremony(e) => ceremony_response(e),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request", self.to_string()),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string()),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

/// A request body that could not be read as the expected JSON
///
/// The serde message can quote the body, so it is only logged.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(status = %rejection.status(), "rejected request body: {}", rejection.body_text());
        AppError::BadRequest("Request body is not valid JSON for this endpoint".to_string())
    }
}

fn ceremony_response(e: &CeremonyError) -> (StatusCode, &'static str, String) {
    if e.is_security_fatal() {
        // Already logged in detail where it was detected
        return (
            StatusCode::UNAUTHORIZED,
            "authentication_failed",
            "Authentication failed".to_string(),
        );
    }

    tracing::debug!(code = e.code(), "ceremony rejected: {}", e);

    let status = match e {
        CeremonyError::UnknownIdentity | CeremonyError::CredentialNotFound => StatusCode::UNAUTHORIZED,
        CeremonyError::DuplicateCredential => StatusCode::CONFLICT,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, e.code(), e.to_string())
}

/// Convenience alias: `AppResult<User>` instead of `Result<User, AppError>`
pub type AppResult<T> = Result<T, AppError>;
