use std::sync::Arc;

use auth::{SqlUserRepository, TokenIssuer, UserService};
use cakehouse_core::{AuthConfig, Database};
use catalog::CatalogService;

/// Application state shared across all handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub users: UserService,
    pub catalog: CatalogService,
}

impl AppState {
    pub fn new(users: UserService, catalog: CatalogService) -> Self {
        Self { users, catalog }
    }

    /// Wire the store-backed services over one shared pool.
    pub fn from_config(db: Database, auth: &AuthConfig) -> Self {
        let tokens = TokenIssuer::new(&auth.jwt_secret, auth.token_expiry_seconds);
        let users = UserService::new(Arc::new(SqlUserRepository::new(db.clone())), tokens);
        let catalog = CatalogService::new(db);

        Self::new(users, catalog)
    }
}
