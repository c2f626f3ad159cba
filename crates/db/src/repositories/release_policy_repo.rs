//! Repository for the `content_release_policies` table.

use drip_core::release::ReleasePolicy;
use drip_core::types::DbId;
use sqlx::PgPool;

use crate::models::release_policy::ContentReleasePolicy;

/// Column list for release policy queries.
const COLUMNS: &str =
    "content_id, release_type, days, fixed_date, prerequisite_id, created_at, updated_at";

/// Provides CRUD operations for drip release policies.
pub struct ReleasePolicyRepo;

impl ReleasePolicyRepo {
    pub async fn find_by_content(
        pool: &PgPool,
        content_id: DbId,
    ) -> Result<Option<ContentReleasePolicy>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM content_release_policies WHERE content_id = $1");
        sqlx::query_as::<_, ContentReleasePolicy>(&query)
            .bind(content_id)
            .fetch_optional(pool)
            .await
    }

    /// List every policy attached to a product's contents.
    pub async fn list_by_product(
        pool: &PgPool,
        product_id: DbId,
    ) -> Result<Vec<ContentReleasePolicy>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM content_release_policies p
             JOIN contents c ON c.id = p.content_id
             JOIN modules m ON m.id = c.module_id
             WHERE m.product_id = $1
             ORDER BY p.content_id",
            qualified("p")
        );
        sqlx::query_as::<_, ContentReleasePolicy>(&query)
            .bind(product_id)
            .fetch_all(pool)
            .await
    }

    /// Attach or replace a content item's policy.
    ///
    /// Columns not belonging to the policy's variant are written as NULL.
    pub async fn upsert(
        pool: &PgPool,
        content_id: DbId,
        policy: &ReleasePolicy,
    ) -> Result<ContentReleasePolicy, sqlx::Error> {
        let query = format!(
            "INSERT INTO content_release_policies
                (content_id, release_type, days, fixed_date, prerequisite_id)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (content_id) DO UPDATE SET
                release_type = EXCLUDED.release_type,
                days = EXCLUDED.days,
                fixed_date = EXCLUDED.fixed_date,
                prerequisite_id = EXCLUDED.prerequisite_id
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ContentReleasePolicy>(&query)
            .bind(content_id)
            .bind(policy.release_type())
            .bind(policy.days())
            .bind(policy.fixed_date())
            .bind(policy.prerequisite_id())
            .fetch_one(pool)
            .await
    }

    /// Remove a content item's policy (it becomes immediately available).
    pub async fn delete(pool: &PgPool, content_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM content_release_policies WHERE content_id = $1")
            .bind(content_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn qualified(alias: &str) -> String {
    COLUMNS
        .split(", ")
        .map(|c| format!("{alias}.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}
