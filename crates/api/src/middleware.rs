use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use std::sync::Arc;

use crate::error::{ApiError, ErrorResponse};
use crate::AppState;
use auth::PublicUser;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Middleware to require authentication
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or_else(|| {
        ApiError::error(StatusCode::UNAUTHORIZED, "Missing or invalid Authorization header")
    })?;

    let user = state
        .users
        .authenticate(token)
        .await
        .map_err(|e| ApiError::from(e).into_error_field())?;

    // Store user in request extensions for handlers to access
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Extractor for authenticated user
/// Use this in handlers that are protected by auth middleware
#[derive(Debug, Clone)]
pub struct AuthUser(pub PublicUser);

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<PublicUser>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| {
                let error = ErrorResponse {
                    error: "User not authenticated".to_string(),
                };
                (StatusCode::UNAUTHORIZED, Json(error))
            })
    }
}
