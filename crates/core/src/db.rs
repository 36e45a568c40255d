//! Connection pool and store error classification.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A UNIQUE constraint rejected the statement. Callers decide what it means.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::UniqueViolation(db_err.message().to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Classify a driver error and log it under `operation`.
///
/// Constraint violations are expected outcomes and only logged at `warn`.
pub fn store_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |err| {
        let classified = StoreError::from(err);
        match &classified {
            StoreError::UniqueViolation(msg) => warn!(operation, "{}", msg),
            StoreError::Database(e) => error!(operation, "Database error: {}", e),
        }
        classified
    }
}

/// Process-wide connection pool. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open a pool against `url`.
    ///
    /// In-memory databases live only as long as their connection, so they
    /// get exactly one connection that is never recycled.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");

        let options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
                .max_connections(max_connections.max(1))
                .acquire_timeout(Duration::from_secs(3))
        };

        let pool = options.connect(url).await.map_err(store_error("connect"))?;
        info!(in_memory, "Database pool ready");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every connection; pending acquires fail afterwards.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_database_keeps_schema_between_queries() {
        let db = Database::connect("sqlite::memory:", 8).await.unwrap();

        sqlx::query("CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT NOT NULL UNIQUE)")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO t (v) VALUES (?)")
            .bind("a")
            .execute(db.pool())
            .await
            .unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM t")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_unique_violation_is_classified() {
        let db = Database::connect("sqlite::memory:", 1).await.unwrap();
        sqlx::query("CREATE TABLE t (v TEXT NOT NULL UNIQUE)")
            .execute(db.pool())
            .await
            .unwrap();

        let insert = || sqlx::query("INSERT INTO t (v) VALUES ('dup')").execute(db.pool());
        insert().await.unwrap();
        let err = insert().await.map_err(store_error("insert")).unwrap_err();

        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn test_other_errors_stay_database_errors() {
        let db = Database::connect("sqlite::memory:", 1).await.unwrap();

        let err = sqlx::query("SELECT * FROM missing_table")
            .execute(db.pool())
            .await
            .map_err(store_error("select"))
            .unwrap_err();

        assert!(matches!(err, StoreError::Database(_)));
    }
}
