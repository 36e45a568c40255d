use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A ready-made cake listing.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cake {
    pub cake_id: i64,
    pub cake_name: String,
    pub flavors_used: Option<String>,
    pub size: Option<String>,
    #[serde(rename = "imageURL")]
    pub image_url: Option<String>,
    pub quantity_available: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/readycakes`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateCakeInput {
    pub cake_name: Option<String>,
    pub flavors_used: Option<String>,
    pub size: Option<String>,
    #[serde(rename = "imageURL")]
    pub image_url: Option<String>,
    pub quantity_available: Option<i64>,
}

/// Body of `PUT /api/readycakes/:id`; absent fields stay as they are.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateCakeInput {
    pub cake_name: Option<String>,
    pub flavors_used: Option<String>,
    pub size: Option<String>,
    #[serde(rename = "imageURL")]
    pub image_url: Option<String>,
    pub quantity_available: Option<i64>,
}

/// Validated partial update handed to the store.
#[derive(Debug, Clone, Default)]
pub struct CakeChanges {
    pub cake_name: Option<String>,
    pub flavors_used: Option<String>,
    pub size: Option<String>,
    pub image_url: Option<String>,
    pub quantity_available: Option<i64>,
}
