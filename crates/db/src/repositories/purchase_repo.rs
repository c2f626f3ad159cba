//! Repository for the `purchases` table.

use drip_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::purchase::{CreatePurchase, Purchase};

const COLUMNS: &str = "id, learner_id, product_id, purchased_at, created_at";

/// Provides access to product purchases.
pub struct PurchaseRepo;

impl PurchaseRepo {
    /// Record a purchase. A repeated purchase keeps the original date.
    pub async fn create(pool: &PgPool, input: &CreatePurchase) -> Result<Purchase, sqlx::Error> {
        let query = format!(
            "INSERT INTO purchases (learner_id, product_id, purchased_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (learner_id, product_id) DO UPDATE SET
                purchased_at = LEAST(purchases.purchased_at, EXCLUDED.purchased_at)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Purchase>(&query)
            .bind(input.learner_id)
            .bind(input.product_id)
            .bind(input.purchased_at)
            .fetch_one(pool)
            .await
    }

    /// The learner's purchase date for a product, if purchased.
    pub async fn purchase_date(
        pool: &PgPool,
        learner_id: DbId,
        product_id: DbId,
    ) -> Result<Option<Timestamp>, sqlx::Error> {
        let row: Option<(Timestamp,)> = sqlx::query_as(
            "SELECT purchased_at FROM purchases WHERE learner_id = $1 AND product_id = $2",
        )
        .bind(learner_id)
        .bind(product_id)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(|(at,)| at))
    }
}
