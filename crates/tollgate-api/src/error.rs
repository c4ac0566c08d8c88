//! API error types

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tollgate_core::CoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Authorization header is required")]
    MissingCredentials,

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::MissingCredentials => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", self.to_string())
            }
            ApiError::Core(e) => match e {
                CoreError::InvalidInput(msg) => {
                    (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone())
                }
                CoreError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS", e.to_string())
                }
                CoreError::InvalidToken(_) => {
                    (StatusCode::UNAUTHORIZED, "INVALID_TOKEN", e.to_string())
                }
                CoreError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN", e.to_string()),
                CoreError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                // Detail was logged where the error was raised
                CoreError::Internal(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    e.to_string(),
                ),
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = axum::Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_core::TokenFault;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::MissingCredentials, StatusCode::UNAUTHORIZED),
            (CoreError::InvalidCredentials.into(), StatusCode::UNAUTHORIZED),
            (
                CoreError::InvalidToken(TokenFault::Revoked).into(),
                StatusCode::UNAUTHORIZED,
            ),
            (CoreError::Forbidden.into(), StatusCode::FORBIDDEN),
            (CoreError::NotFound("user 1".into()).into(), StatusCode::NOT_FOUND),
            (CoreError::Conflict("dup".into()).into(), StatusCode::CONFLICT),
            (
                CoreError::Internal("secret detail".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_internal_detail_not_exposed() {
        let err: ApiError = CoreError::Internal("sqlite: disk I/O error".into()).into();
        let (_, code, message) = err.parts();

        assert_eq!(code, "INTERNAL_ERROR");
        assert_eq!(message, "internal error");
    }

    #[test]
    fn test_token_faults_are_indistinguishable() {
        let expired: ApiError = CoreError::InvalidToken(TokenFault::Expired).into();
        let revoked: ApiError = CoreError::InvalidToken(TokenFault::Revoked).into();

        assert_eq!(expired.parts(), revoked.parts());
    }
}
