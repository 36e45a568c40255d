use async_trait::async_trait;
use cakehouse_core::{store_error, Database, StoreResult};
use chrono::Utc;
use tracing::info;

use crate::model::{NewUser, PublicUser, PublicUserRow, Role, User, UserChanges, UserRow};

/// Persistence port for accounts. Every method is a single statement.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// All users, without password or verification code.
    async fn find_all(&self) -> StoreResult<Vec<PublicUser>>;
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    /// Insert and return the store-assigned id. A taken email surfaces as
    /// `StoreError::UniqueViolation`.
    async fn insert(&self, user: &NewUser) -> StoreResult<i64>;
    /// Merge `changes` into the row; returns the affected row count.
    async fn update(&self, id: i64, changes: &UserChanges) -> StoreResult<u64>;
    async fn delete(&self, id: i64) -> StoreResult<u64>;
    async fn set_verified(&self, id: i64) -> StoreResult<u64>;
    async fn clear_verification_code(&self, id: i64) -> StoreResult<u64>;
    /// Mark verified and clear the code in one statement, only while `code`
    /// is still the stored one. Returns 0 when the code was already consumed.
    async fn confirm_verification(&self, id: i64, code: &str) -> StoreResult<u64>;
    async fn count_by_role(&self, role: Role) -> StoreResult<i64>;
}

const USER_COLUMNS: &str = "id, name, email, phone, address, password, role, \
     is_verified, verification_code, created_at, updated_at";

const PUBLIC_USER_COLUMNS: &str =
    "id, name, email, phone, address, role, is_verified, created_at, updated_at";

/// [`UserRepository`] over the shared SQL pool.
#[derive(Debug, Clone)]
pub struct SqlUserRepository {
    db: Database,
}

impl SqlUserRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl UserRepository for SqlUserRepository {
    async fn find_all(&self) -> StoreResult<Vec<PublicUser>> {
        let rows: Vec<PublicUserRow> =
            sqlx::query_as(&format!("SELECT {PUBLIC_USER_COLUMNS} FROM users ORDER BY id"))
                .fetch_all(self.db.pool())
                .await
                .map_err(store_error("find_all_users"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
                .bind(id)
                .fetch_optional(self.db.pool())
                .await
                .map_err(store_error("find_user_by_id"))?;

        Ok(row.map(Into::into))
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
                .bind(email)
                .fetch_optional(self.db.pool())
                .await
                .map_err(store_error("find_user_by_email"))?;

        Ok(row.map(Into::into))
    }

    async fn insert(&self, user: &NewUser) -> StoreResult<i64> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO users (
                name, email, phone, address, password, role,
                is_verified, verification_code, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.is_verified)
        .bind(&user.verification_code)
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await
        .map_err(store_error("insert_user"))?;

        let id = result.last_insert_rowid();
        info!(user_id = id, role = %user.role, "User row inserted");
        Ok(id)
    }

    async fn update(&self, id: i64, changes: &UserChanges) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET
                name = COALESCE(?, name),
                email = COALESCE(?, email),
                phone = COALESCE(?, phone),
                address = COALESCE(?, address),
                password = COALESCE(?, password),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&changes.name)
        .bind(&changes.email)
        .bind(&changes.phone)
        .bind(&changes.address)
        .bind(&changes.password_hash)
        .bind(Utc::now())
        .bind(id)
        .execute(self.db.pool())
        .await
        .map_err(store_error("update_user"))?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, id: i64) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await
            .map_err(store_error("delete_user"))?;

        Ok(result.rows_affected())
    }

    async fn set_verified(&self, id: i64) -> StoreResult<u64> {
        let result = sqlx::query("UPDATE users SET is_verified = 1, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(self.db.pool())
            .await
            .map_err(store_error("set_user_verified"))?;

        Ok(result.rows_affected())
    }

    async fn clear_verification_code(&self, id: i64) -> StoreResult<u64> {
        let result =
            sqlx::query("UPDATE users SET verification_code = NULL, updated_at = ? WHERE id = ?")
                .bind(Utc::now())
                .bind(id)
                .execute(self.db.pool())
                .await
                .map_err(store_error("clear_verification_code"))?;

        Ok(result.rows_affected())
    }

    async fn confirm_verification(&self, id: i64, code: &str) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_verified = 1, verification_code = NULL, updated_at = ?
            WHERE id = ? AND verification_code = ?
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .bind(code)
        .execute(self.db.pool())
        .await
        .map_err(store_error("confirm_verification"))?;

        Ok(result.rows_affected())
    }

    async fn count_by_role(&self, role: Role) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = ?")
            .bind(role.as_str())
            .fetch_one(self.db.pool())
            .await
            .map_err(store_error("count_users_by_role"))
    }
}
