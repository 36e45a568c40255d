//! Ready-made cake catalog
//!
//! Provides functionality for:
//! - Listing and fetching cakes that are on sale
//! - Adding cakes
//! - Partial updates
//! - Soft deletion (rows are flagged inactive, never removed)

pub mod model;
pub mod service;

pub use model::{Cake, CakeChanges, CreateCakeInput, UpdateCakeInput};
pub use service::CatalogService;

use cakehouse_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Invalid cake ID")]
    InvalidId,

    #[error("Cake not found")]
    NotFound,

    #[error("Cake name is required")]
    MissingName,

    #[error("Quantity available cannot be negative")]
    NegativeQuantity,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
