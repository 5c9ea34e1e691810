//! Error types for leadtrail-attribution

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::identity::IdentityKind;

/// Attribution resolution error
#[derive(Debug, Error)]
pub enum AttributionError {
    /// The visit store could not be queried. Never reported as `direct`.
    #[error("Attribution lookup failed during {strategy} match: {source}")]
    LookupFailed {
        strategy: IdentityKind,
        #[source]
        source: leadtrail_common::Error,
    },

    /// Any other leadtrail-common error
    #[error(transparent)]
    Common(#[from] leadtrail_common::Error),
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Visit store unavailable while resolving attribution (503)
    #[error(transparent)]
    Attribution(#[from] AttributionError),

    /// leadtrail-common error
    #[error(transparent)]
    Common(#[from] leadtrail_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Attribution(AttributionError::LookupFailed { .. }) => {
                (StatusCode::SERVICE_UNAVAILABLE, "ATTRIBUTION_LOOKUP_FAILED")
            }
            ApiError::Attribution(AttributionError::Common(err)) | ApiError::Common(err) => {
                common_status(err)
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

fn common_status(err: &leadtrail_common::Error) -> (StatusCode, &'static str) {
    use leadtrail_common::Error;

    match err {
        Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
        Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        Error::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
        Error::Io(_) | Error::Config(_) | Error::Internal(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
