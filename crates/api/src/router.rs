use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::{catalog_handlers, middleware as auth_middleware, user_handlers, AppState};
use cakehouse_core::CorsConfig;

pub fn router(state: Arc<AppState>, cors: &CorsConfig) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/", get(|| async { "Cake House API running" }))
        .route("/users/register", post(user_handlers::register))
        .route("/users/login", post(user_handlers::login))
        .route("/users/verify", post(user_handlers::verify))
        .route("/users", get(user_handlers::list_users))
        .route(
            "/users/{id}",
            get(user_handlers::get_user)
                .put(user_handlers::update_user)
                .delete(user_handlers::delete_user),
        );

    // Account routes (require a bearer token)
    let account_routes = Router::new()
        .route("/auth/me", get(user_handlers::me))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::require_auth,
        ));

    let catalog_routes = Router::new()
        .route(
            "/api/readycakes",
            get(catalog_handlers::list_cakes).post(catalog_handlers::add_cake),
        )
        .route(
            "/api/readycakes/{id}",
            get(catalog_handlers::get_cake)
                .put(catalog_handlers::update_cake)
                .delete(catalog_handlers::delete_cake),
        );

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .merge(account_routes)
        .merge(catalog_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors))
        .with_state(state)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    match config.allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            warn!(origin = %config.allowed_origin, "Ignoring invalid CORS origin: {}", e);
            layer
        }
    }
}
