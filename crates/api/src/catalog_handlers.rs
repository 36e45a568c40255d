use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::error::{ApiError, MessageResponse};
use crate::extract::JsonBody;
use crate::AppState;
use catalog::{Cake, CatalogError, CreateCakeInput, UpdateCakeInput};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCakeResponse {
    pub message: String,
    pub new_cake: Cake,
}

/// GET /api/readycakes
pub async fn list_cakes(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Cake>>, ApiError> {
    Ok(Json(state.catalog.list().await?))
}

/// GET /api/readycakes/{id}
pub async fn get_cake(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Cake>, ApiError> {
    Ok(Json(state.catalog.get(&id).await?))
}

/// POST /api/readycakes
pub async fn add_cake(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<CreateCakeInput>,
) -> Result<(StatusCode, Json<CreateCakeResponse>), ApiError> {
    let new_cake = state.catalog.create(payload).await?;

    let response = CreateCakeResponse {
        message: "Cake added successfully".to_string(),
        new_cake,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// PUT /api/readycakes/{id}
///
/// An unknown cake is a 400 here, unlike GET and DELETE.
pub async fn update_cake(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<UpdateCakeInput>,
) -> Result<Json<MessageResponse>, ApiError> {
    match state.catalog.update(&id, payload).await {
        Ok(()) => Ok(Json(MessageResponse::new("Cake updated successfully"))),
        Err(CatalogError::NotFound) => Err(ApiError::message(
            StatusCode::BAD_REQUEST,
            CatalogError::NotFound.to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

/// DELETE /api/readycakes/{id}
pub async fn delete_cake(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.catalog.delete(&id).await?;
    Ok(Json(MessageResponse::new("Cake deleted successfully")))
}
