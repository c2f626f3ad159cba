//! Repository for the `contents` table.

use drip_core::types::DbId;
use sqlx::PgPool;

use crate::models::content::{Content, CreateContent, UpdateContent};

/// Column list for contents queries.
const COLUMNS: &str = "id, module_id, title, position, duration_seconds, is_active, \
    created_at, updated_at";

/// Same columns, qualified for joins against `modules`.
const COLUMNS_C: &str = "c.id, c.module_id, c.title, c.position, c.duration_seconds, \
    c.is_active, c.created_at, c.updated_at";

/// Provides CRUD and ordering operations for content items.
pub struct ContentRepo;

impl ContentRepo {
    /// Insert a content item at the end of its module's ordering.
    pub async fn create(pool: &PgPool, input: &CreateContent) -> Result<Content, sqlx::Error> {
        let query = format!(
            "INSERT INTO contents (module_id, title, position, duration_seconds)
             VALUES ($1, $2, (SELECT COALESCE(MAX(position), 0) + 1 FROM contents WHERE module_id = $1), $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Content>(&query)
            .bind(input.module_id)
            .bind(&input.title)
            .bind(input.duration_seconds)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Content>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM contents WHERE id = $1");
        sqlx::query_as::<_, Content>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a module's contents (active and inactive) in position order.
    pub async fn list_by_module(
        pool: &PgPool,
        module_id: DbId,
    ) -> Result<Vec<Content>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM contents
             WHERE module_id = $1
             ORDER BY position, id"
        );
        sqlx::query_as::<_, Content>(&query)
            .bind(module_id)
            .fetch_all(pool)
            .await
    }

    /// List every content item of a product, ordered by module then content position.
    pub async fn list_by_product(
        pool: &PgPool,
        product_id: DbId,
    ) -> Result<Vec<Content>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS_C} FROM contents c
             JOIN modules m ON m.id = c.module_id
             WHERE m.product_id = $1
             ORDER BY m.position, c.position, c.id"
        );
        sqlx::query_as::<_, Content>(&query)
            .bind(product_id)
            .fetch_all(pool)
            .await
    }

    /// Update a content item. Only non-`None` fields are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateContent,
    ) -> Result<Option<Content>, sqlx::Error> {
        let query = format!(
            "UPDATE contents SET
                title = COALESCE($2, title),
                duration_seconds = COALESCE($3, duration_seconds)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Content>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(input.duration_seconds)
            .fetch_optional(pool)
            .await
    }

    /// Soft-deactivate a content item. Returns `true` if a row changed.
    pub async fn deactivate(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE contents SET is_active = FALSE WHERE id = $1 AND is_active")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Rewrite positions for a module's contents in one transaction.
    pub async fn update_positions(
        pool: &PgPool,
        module_id: DbId,
        positions: &[(DbId, i32)],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        for (id, position) in positions {
            let result = sqlx::query(
                "UPDATE contents SET position = $3 WHERE id = $1 AND module_id = $2",
            )
            .bind(id)
            .bind(module_id)
            .bind(position)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(sqlx::Error::RowNotFound);
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
