//! Error types for the authentication service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced at the authentication request boundary
#[derive(Error, Debug)]
pub enum AuthError {
    /// Missing or invalid bearer token
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Wrong email/password or unknown account
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Malformed input
    #[error("{0}")]
    Validation(String),

    /// OTP past its validity window (distinct from a wrong code)
    #[error("OTP expired")]
    Expired,

    /// Too many OTP requests for the same phone
    #[error("Too many OTP requests, try again later")]
    RateLimited,

    /// SMS provider failure
    #[error("Failed to send OTP: {0}")]
    Sms(String),

    /// Database failure
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    /// Anything else
    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthError::Unauthenticated | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::Validation(_) | AuthError::Expired | AuthError::Sms(_) => {
                StatusCode::BAD_REQUEST
            }
            AuthError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AuthError::Database(_) | AuthError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            AuthError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Database error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({ "message": message }));
        (status, body).into_response()
    }
}

/// Type alias for auth results
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_is_distinct_from_invalid_otp() {
        let expired = AuthError::Expired.to_string();
        let invalid = AuthError::Validation("Invalid OTP".to_string()).to_string();
        assert_ne!(expired, invalid);
        assert_eq!(expired, "OTP expired");
    }

    #[test]
    fn status_codes_match_taxonomy() {
        let resp = AuthError::Unauthenticated.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = AuthError::Expired.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = AuthError::RateLimited.into_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
