//! Repository for the `modules` table.

use drip_core::types::DbId;
use sqlx::PgPool;

use crate::models::module::{CreateModule, Module};

/// Column list for modules queries.
const COLUMNS: &str = "id, product_id, name, position, created_at, updated_at";

/// Provides CRUD and ordering operations for course modules.
pub struct ModuleRepo;

impl ModuleRepo {
    /// Insert a module at the end of its product's ordering.
    pub async fn create(pool: &PgPool, input: &CreateModule) -> Result<Module, sqlx::Error> {
        let query = format!(
            "INSERT INTO modules (product_id, name, position)
             VALUES ($1, $2, (SELECT COALESCE(MAX(position), 0) + 1 FROM modules WHERE product_id = $1))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Module>(&query)
            .bind(input.product_id)
            .bind(&input.name)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Module>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM modules WHERE id = $1");
        sqlx::query_as::<_, Module>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a product's modules in position order.
    pub async fn list_by_product(
        pool: &PgPool,
        product_id: DbId,
    ) -> Result<Vec<Module>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM modules
             WHERE product_id = $1
             ORDER BY position, id"
        );
        sqlx::query_as::<_, Module>(&query)
            .bind(product_id)
            .fetch_all(pool)
            .await
    }

    /// Rewrite positions for a product's modules in one transaction.
    ///
    /// The `(product_id, position)` unique constraint is deferred, so
    /// intermediate duplicates inside the transaction are allowed.
    pub async fn update_positions(
        pool: &PgPool,
        product_id: DbId,
        positions: &[(DbId, i32)],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        for (id, position) in positions {
            let result = sqlx::query(
                "UPDATE modules SET position = $3 WHERE id = $1 AND product_id = $2",
            )
            .bind(id)
            .bind(product_id)
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
