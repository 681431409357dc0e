//! HTTP error mapping for hcat-fm
//!
//! Every failure renders as `{"error": {"code", "message"}}`; validation
//! failures also carry the offending `field`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request that never reached the core (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Error raised by the moderation core or storage
    #[error(transparent)]
    Core(#[from] hcat_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use hcat_common::Error;

        let mut field = None;
        let (status, code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Core(err) => match err {
                Error::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
                Error::Validation { field: f, message } => {
                    field = Some(f);
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
                }
                Error::InvalidState(msg) => (StatusCode::CONFLICT, "INVALID_STATE", msg),
                Error::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
                Error::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
                other => {
                    // Storage details stay in the log
                    error!(error = %other, "Request failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "STORAGE_ERROR",
                        "internal storage error".to_string(),
                    )
                }
            },
        };

        let mut body = json!({
            "error": {
                "code": code,
                "message": message,
            }
        });
        if let Some(field) = field {
            body["error"]["field"] = json!(field);
        }

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use hcat_common::Error;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_of(Error::NotFound("x".into()).into()), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(Error::validation("status", "bad").into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(Error::InvalidState("x".into()).into()), StatusCode::CONFLICT);
        assert_eq!(
            status_of(Error::Unauthorized("x".into()).into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status_of(Error::Forbidden("x".into()).into()), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(Error::Internal("x".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(ApiError::BadRequest("x".into())),
            StatusCode::BAD_REQUEST
        );
    }
}
