use std::sync::Arc;

use api::{router::router, AppState};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use cakehouse_core::{run_migrations, AuthConfig, CorsConfig, Database};
use serde_json::Value;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub db: Database,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = Database::connect("sqlite::memory:", 1).await.unwrap();
        run_migrations(&db).await.unwrap();

        let auth = AuthConfig {
            jwt_secret: "integration-test-secret".to_string(),
            token_expiry_seconds: 3600,
        };
        let state = Arc::new(AppState::from_config(db.clone(), &auth));

        Self {
            router: router(state, &CorsConfig::default()),
            db,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    pub async fn verification_code(&self, email: &str) -> Option<String> {
        sqlx::query_scalar::<_, Option<String>>(
            "SELECT verification_code FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_one(self.db.pool())
        .await
        .unwrap()
    }

    /// Insert a row bypassing registration, with `password` stored as given.
    pub async fn insert_raw_user(&self, email: &str, password: &str) {
        sqlx::query(
            r#"
            INSERT INTO users (name, email, password, role, is_verified, created_at, updated_at)
            VALUES (
                'Legacy', ?, ?, 'customer', 1,
                strftime('%Y-%m-%dT%H:%M:%SZ', 'now'),
                strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
            )
            "#,
        )
        .bind(email)
        .bind(password)
        .execute(self.db.pool())
        .await
        .unwrap();
    }
}
