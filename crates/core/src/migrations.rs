use chrono::Utc;
use tracing::{debug, info};

use crate::db::{store_error, Database, StoreResult};

/// One forward-only schema step. Each step is a single SQL statement.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub sql: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 20_250_301_000_001,
        name: "create_users_table",
        sql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                phone TEXT,
                address TEXT,
                password TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'customer',
                is_verified INTEGER NOT NULL DEFAULT 0,
                verification_code TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
        "#,
    },
    Migration {
        version: 20_250_301_000_002,
        name: "create_ready_made_cakes_table",
        sql: r#"
            CREATE TABLE IF NOT EXISTS ready_made_cakes (
                cake_id INTEGER PRIMARY KEY AUTOINCREMENT,
                cake_name TEXT NOT NULL,
                flavors_used TEXT,
                size TEXT,
                image_url TEXT,
                quantity_available INTEGER NOT NULL DEFAULT 1,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
        "#,
    },
    Migration {
        version: 20_250_301_000_003,
        name: "index_ready_made_cakes_active",
        sql: "CREATE INDEX IF NOT EXISTS idx_ready_made_cakes_active ON ready_made_cakes (is_active)",
    },
];

/// Apply every pending migration in version order.
/// Returns how many were applied by this call.
pub async fn run_migrations(db: &Database) -> StoreResult<usize> {
    let pool = db.pool();

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await
    .map_err(store_error("create_migrations_table"))?;

    let mut pending: Vec<&Migration> = MIGRATIONS.iter().collect();
    pending.sort_by_key(|m| m.version);

    let mut applied = 0;
    for migration in pending {
        let existing: Option<i64> =
            sqlx::query_scalar("SELECT version FROM _migrations WHERE version = ?")
                .bind(migration.version)
                .fetch_optional(pool)
                .await
                .map_err(store_error("read_migrations"))?;

        if existing.is_some() {
            debug!(version = migration.version, "Migration already applied");
            continue;
        }

        let mut tx = pool.begin().await.map_err(store_error("begin_migration"))?;
        sqlx::query(migration.sql)
            .execute(&mut *tx)
            .await
            .map_err(store_error("apply_migration"))?;
        sqlx::query("INSERT INTO _migrations (version, name, applied_at) VALUES (?, ?, ?)")
            .bind(migration.version)
            .bind(migration.name)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(store_error("record_migration"))?;
        tx.commit().await.map_err(store_error("commit_migration"))?;

        info!(version = migration.version, name = migration.name, "Applied migration");
        applied += 1;
    }

    Ok(applied)
}
