use cakehouse_core::{parse_positive_id, store_error, Database};
use chrono::Utc;
use tracing::info;

use crate::{Cake, CakeChanges, CatalogError, CreateCakeInput, Result, UpdateCakeInput};

const CAKE_COLUMNS: &str = "cake_id, cake_name, flavors_used, size, image_url, \
     quantity_available, is_active, created_at, updated_at";

/// Catalog service over the `ready_made_cakes` table.
///
/// Inactive rows are invisible to every operation.
#[derive(Debug, Clone)]
pub struct CatalogService {
    db: Database,
}

impl CatalogService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// All cakes currently on sale.
    pub async fn list(&self) -> Result<Vec<Cake>> {
        let cakes = sqlx::query_as::<_, Cake>(&format!(
            "SELECT {CAKE_COLUMNS} FROM ready_made_cakes WHERE is_active = 1 ORDER BY cake_id"
        ))
        .fetch_all(self.db.pool())
        .await
        .map_err(store_error("list_cakes"))?;

        Ok(cakes)
    }

    pub async fn get(&self, raw_id: &str) -> Result<Cake> {
        let id = parse_cake_id(raw_id)?;
        self.find_active(id).await?.ok_or(CatalogError::NotFound)
    }

    /// Add a cake. `quantityAvailable` defaults to 1.
    pub async fn create(&self, input: CreateCakeInput) -> Result<Cake> {
        let cake_name = present(input.cake_name).ok_or(CatalogError::MissingName)?;
        let quantity = input.quantity_available.unwrap_or(1);
        if quantity < 0 {
            return Err(CatalogError::NegativeQuantity);
        }

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO ready_made_cakes (
                cake_name, flavors_used, size, image_url, quantity_available,
                is_active, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(&cake_name)
        .bind(present(input.flavors_used))
        .bind(present(input.size))
        .bind(present(input.image_url))
        .bind(quantity)
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await
        .map_err(store_error("insert_cake"))?;

        let id = result.last_insert_rowid();
        info!(cake_id = id, "Cake added");

        self.find_active(id).await?.ok_or(CatalogError::NotFound)
    }

    /// Merge the provided fields into an active cake.
    pub async fn update(&self, raw_id: &str, input: UpdateCakeInput) -> Result<()> {
        let id = parse_cake_id(raw_id)?;
        if input.quantity_available.is_some_and(|q| q < 0) {
            return Err(CatalogError::NegativeQuantity);
        }

        let changes = CakeChanges {
            cake_name: present(input.cake_name),
            flavors_used: present(input.flavors_used),
            size: present(input.size),
            image_url: present(input.image_url),
            quantity_available: input.quantity_available,
        };

        let result = sqlx::query(
            r#"
            UPDATE ready_made_cakes
            SET
                cake_name = COALESCE(?, cake_name),
                flavors_used = COALESCE(?, flavors_used),
                size = COALESCE(?, size),
                image_url = COALESCE(?, image_url),
                quantity_available = COALESCE(?, quantity_available),
                updated_at = ?
            WHERE cake_id = ? AND is_active = 1
            "#,
        )
        .bind(&changes.cake_name)
        .bind(&changes.flavors_used)
        .bind(&changes.size)
        .bind(&changes.image_url)
        .bind(changes.quantity_available)
        .bind(Utc::now())
        .bind(id)
        .execute(self.db.pool())
        .await
        .map_err(store_error("update_cake"))?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound);
        }

        info!(cake_id = id, "Cake updated");
        Ok(())
    }

    /// Soft delete: the row stays but drops out of the catalog.
    pub async fn delete(&self, raw_id: &str) -> Result<()> {
        let id = parse_cake_id(raw_id)?;

        let result = sqlx::query(
            "UPDATE ready_made_cakes SET is_active = 0, updated_at = ? WHERE cake_id = ? AND is_active = 1",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(self.db.pool())
        .await
        .map_err(store_error("deactivate_cake"))?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound);
        }

        info!(cake_id = id, "Cake deactivated");
        Ok(())
    }

    async fn find_active(&self, id: i64) -> Result<Option<Cake>> {
        let cake = sqlx::query_as::<_, Cake>(&format!(
            "SELECT {CAKE_COLUMNS} FROM ready_made_cakes WHERE cake_id = ? AND is_active = 1"
        ))
        .bind(id)
        .fetch_optional(self.db.pool())
        .await
        .map_err(store_error("find_cake"))?;

        Ok(cake)
    }
}

fn parse_cake_id(raw: &str) -> Result<i64> {
    parse_positive_id(raw).ok_or(CatalogError::InvalidId)
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cakehouse_core::run_migrations;

    async fn service() -> CatalogService {
        let db = Database::connect("sqlite::memory:", 1).await.unwrap();
        run_migrations(&db).await.unwrap();
        CatalogService::new(db)
    }

    fn chocolate() -> CreateCakeInput {
        CreateCakeInput {
            cake_name: Some("Test Chocolate Cake".to_string()),
            flavors_used: Some("Chocolate, Cocoa".to_string()),
            size: Some("Small".to_string()),
            image_url: Some("testcake.jpg".to_string()),
            quantity_available: Some(5),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let catalog = service().await;

        let cake = catalog.create(chocolate()).await.unwrap();
        assert!(cake.cake_id > 0);
        assert!(cake.is_active);
        assert_eq!(cake.quantity_available, 5);

        let fetched = catalog.get(&cake.cake_id.to_string()).await.unwrap();
        assert_eq!(fetched, cake);
    }

    #[tokio::test]
    async fn test_create_defaults_and_validation() {
        let catalog = service().await;

        let input = CreateCakeInput {
            cake_name: Some("Plain".to_string()),
            ..Default::default()
        };
        assert_eq!(catalog.create(input).await.unwrap().quantity_available, 1);

        assert!(matches!(
            catalog.create(CreateCakeInput::default()).await,
            Err(CatalogError::MissingName)
        ));

        let negative = CreateCakeInput {
            quantity_available: Some(-2),
            ..chocolate()
        };
        assert!(matches!(catalog.create(negative).await, Err(CatalogError::NegativeQuantity)));
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let catalog = service().await;
        let cake = catalog.create(chocolate()).await.unwrap();
        let id = cake.cake_id.to_string();

        let input = UpdateCakeInput {
            size: Some("Large".to_string()),
            quantity_available: Some(8),
            ..Default::default()
        };
        catalog.update(&id, input).await.unwrap();

        let updated = catalog.get(&id).await.unwrap();
        assert_eq!(updated.size.as_deref(), Some("Large"));
        assert_eq!(updated.quantity_available, 8);
        assert_eq!(updated.cake_name, "Test Chocolate Cake");

        assert!(matches!(
            catalog.update("999999", UpdateCakeInput::default()).await,
            Err(CatalogError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_soft_delete_hides_cake() {
        let catalog = service().await;
        let kept = catalog.create(chocolate()).await.unwrap();
        let removed = catalog.create(chocolate()).await.unwrap();
        let id = removed.cake_id.to_string();

        catalog.delete(&id).await.unwrap();

        let listed = catalog.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].cake_id, kept.cake_id);

        assert!(matches!(catalog.get(&id).await, Err(CatalogError::NotFound)));
        assert!(matches!(catalog.delete(&id).await, Err(CatalogError::NotFound)));
        assert!(matches!(
            catalog.update(&id, UpdateCakeInput::default()).await,
            Err(CatalogError::NotFound)
        ));

        // The row itself is still there
        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ready_made_cakes")
            .fetch_one(catalog.db.pool())
            .await
            .unwrap();
        assert_eq!(rows, 2);
    }

    #[tokio::test]
    async fn test_invalid_ids() {
        let catalog = service().await;

        assert!(matches!(catalog.get("abc").await, Err(CatalogError::InvalidId)));
        assert!(matches!(catalog.delete("0").await, Err(CatalogError::InvalidId)));
        assert!(matches!(
            catalog.update("-1", UpdateCakeInput::default()).await,
            Err(CatalogError::InvalidId)
        ));
    }
}
