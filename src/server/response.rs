use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::Error;

/// API error that converts to a proper HTTP response with a stable code.
///
/// This is the single terminal converter for the request path: handlers let
/// typed errors surface via `?` and the conversion here decides status,
/// body, and log level.
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.code();
        let (status, message) = match &error {
            Error::Validation(_) => (StatusCode::BAD_REQUEST, error.to_string()),
            Error::Unauthorized => (StatusCode::UNAUTHORIZED, error.to_string()),
            Error::InvalidKey => (StatusCode::UNAUTHORIZED, error.to_string()),
            Error::Forbidden(_) => (StatusCode::FORBIDDEN, error.to_string()),
            Error::NotFound => (StatusCode::NOT_FOUND, error.to_string()),
            Error::Conflict(_) => (StatusCode::CONFLICT, error.to_string()),
            Error::Database(_) | Error::Io(_) | Error::Config(_) | Error::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        if status.is_server_error() {
            tracing::error!("request failed: {error:?}");
        } else {
            tracing::warn!("request rejected: {error}");
        }

        Self {
            status,
            code,
            message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "error": { "code": self.code, "message": self.message } });
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (Error::Unauthorized, StatusCode::UNAUTHORIZED),
            (Error::InvalidKey, StatusCode::UNAUTHORIZED),
            (Error::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (Error::NotFound, StatusCode::NOT_FOUND),
            (Error::Conflict("dup".into()), StatusCode::CONFLICT),
            (
                Error::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status, status);
        }
    }

    #[test]
    fn test_internal_errors_are_opaque() {
        let api = ApiError::from(Error::Internal("pool exhausted".into()));
        assert_eq!(api.message, "internal error");
        assert_eq!(api.code, "INTERNAL_ERROR");
    }
}
