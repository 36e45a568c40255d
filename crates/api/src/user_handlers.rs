use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::error::{ApiError, MessageResponse};
use crate::extract::JsonBody;
use crate::middleware::AuthUser;
use crate::AppState;
use auth::{AuthError, LoginInput, PublicUser, RegisterInput, UpdateInput, VerifyInput};
use cakehouse_core::parse_positive_id;

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub data: Vec<PublicUser>,
}

/// POST /users/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<RegisterInput>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let user = state.users.register(payload).await?;

    let response = RegisterResponse {
        message: "User created successfully. Check your email for the verification code"
            .to_string(),
        user,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /users/login. Failures are reported under `error`.
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<JsonBody<LoginInput>, ApiError>,
) -> Result<Json<AuthResponse>, ApiError> {
    let JsonBody(payload) = payload.map_err(ApiError::into_error_field)?;

    let (token, user) = state
        .users
        .login(payload)
        .await
        .map_err(|e| ApiError::from(e).into_error_field())?;

    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        token,
        user,
    }))
}

/// POST /users/verify
pub async fn verify(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<VerifyInput>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.users.verify(payload).await?;
    Ok(Json(MessageResponse::new("Account verified successfully")))
}

/// GET /users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<UserListResponse>, ApiError> {
    let data = state.users.list().await?;
    Ok(Json(UserListResponse { data }))
}

/// GET /users/{id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PublicUser>, ApiError> {
    Ok(Json(state.users.get(&id).await?))
}

/// PUT /users/{id}
///
/// The id is checked before the body so a malformed id is always `Invalid user ID`.
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<JsonBody<UpdateInput>, ApiError>,
) -> Result<Json<MessageResponse>, ApiError> {
    if parse_positive_id(&id).is_none() {
        return Err(AuthError::InvalidId.into());
    }
    let JsonBody(payload) = payload?;

    state.users.update(&id, payload).await?;
    Ok(Json(MessageResponse::new("User updated successfully")))
}

/// DELETE /users/{id}
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.users.delete(&id).await?;
    Ok(Json(MessageResponse::new("user deleted successfully")))
}

/// GET /auth/me (bearer token required)
pub async fn me(AuthUser(user): AuthUser) -> Json<PublicUser> {
    Json(user)
}
