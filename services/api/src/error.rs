//! Custom error types for the marketplace API service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced at the request boundary
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or invalid bearer token
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Caller lacks the role or ownership for the operation
    #[error("{0}")]
    Forbidden(String),

    /// Entity does not exist (or is not visible to the caller)
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Malformed input
    #[error("{0}")]
    Validation(String),

    /// External payment provider failure; the local payment row stays
    /// pending for later reconciliation
    #[error("{0}")]
    Gateway(String),

    /// Database failure
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    /// Anything else
    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) | ApiError::Gateway(_) => StatusCode::BAD_REQUEST,
            ApiError::Database(_) | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            ApiError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Database error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({ "message": message }));
        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            ApiError::Unauthenticated.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("Admin access required".into())
                .into_response()
                .status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("Property").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Validation("bad input".into())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Gateway("provider said no".into())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
    }
}
