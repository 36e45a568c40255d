use auth::AuthError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use catalog::CatalogError;
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Failure response. Most routes report under `message`; login and the
/// token guard report under `error`.
#[derive(Debug)]
pub enum ApiError {
    Message(StatusCode, String),
    Error(StatusCode, String),
}

impl ApiError {
    pub fn message(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError::Message(status, message.into())
    }

    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError::Error(status, message.into())
    }

    /// Same status and text, reported under `error`.
    pub fn into_error_field(self) -> Self {
        match self {
            ApiError::Message(status, message) => ApiError::Error(status, message),
            other => other,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Message(status, _) | ApiError::Error(status, _) => *status,
        }
    }

    fn internal(source: &dyn std::fmt::Display) -> Self {
        error!("Request failed: {}", source);
        ApiError::message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Message(status, message) => {
                (status, Json(MessageResponse { message })).into_response()
            }
            ApiError::Error(status, error) => (status, Json(ErrorResponse { error })).into_response(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let status = match &err {
            AuthError::MissingFields(_) | AuthError::InvalidId => StatusCode::BAD_REQUEST,
            // A client error reported as a server error; existing clients depend on it.
            AuthError::DuplicateEmail => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::UserNotFound | AuthError::CodeMismatch => StatusCode::NOT_FOUND,
            AuthError::WrongPassword | AuthError::InvalidToken(_) | AuthError::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::HashFormatError(_)
            | AuthError::HashingError(_)
            | AuthError::TokenGenerationError(_)
            | AuthError::Store(_) => return ApiError::internal(&err),
        };
        ApiError::message(status, err.to_string())
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        let status = match &err {
            CatalogError::InvalidId | CatalogError::MissingName | CatalogError::NegativeQuantity => {
                StatusCode::BAD_REQUEST
            }
            CatalogError::NotFound => StatusCode::NOT_FOUND,
            CatalogError::Store(_) => return ApiError::internal(&err),
        };
        ApiError::message(status, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cakehouse_core::StoreError;

    #[test]
    fn test_auth_error_statuses() {
        let cases = [
            (AuthError::MissingFields("x"), StatusCode::BAD_REQUEST),
            (AuthError::InvalidId, StatusCode::BAD_REQUEST),
            (AuthError::DuplicateEmail, StatusCode::INTERNAL_SERVER_ERROR),
            (AuthError::UserNotFound, StatusCode::NOT_FOUND),
            (AuthError::CodeMismatch, StatusCode::NOT_FOUND),
            (AuthError::WrongPassword, StatusCode::UNAUTHORIZED),
            (AuthError::TokenExpired, StatusCode::UNAUTHORIZED),
            (
                AuthError::HashFormatError("bad".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_store_errors_are_not_leaked() {
        let err = AuthError::Store(StoreError::UniqueViolation("users.email".to_string()));
        match ApiError::from(err) {
            ApiError::Message(status, message) => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(message, "Internal server error");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_into_error_field_keeps_status() {
        let err = ApiError::from(AuthError::UserNotFound).into_error_field();
        assert!(matches!(err, ApiError::Error(StatusCode::NOT_FOUND, ref m) if m == "User not found"));
    }
}
