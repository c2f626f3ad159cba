//! Repository for the `learner_course_completions` table.

use drip_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::completion::CourseCompletion;

const COLUMNS: &str = "learner_id, product_id, overall_percent, completed_at, updated_at";

/// Stores the last observed overall percent per learner and product.
pub struct CompletionRepo;

impl CompletionRepo {
    pub async fn find(
        pool: &PgPool,
        learner_id: DbId,
        product_id: DbId,
    ) -> Result<Option<CourseCompletion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM learner_course_completions
             WHERE learner_id = $1 AND product_id = $2"
        );
        sqlx::query_as::<_, CourseCompletion>(&query)
            .bind(learner_id)
            .bind(product_id)
            .fetch_optional(pool)
            .await
    }

    /// Record the latest percent. `completed_at` is kept once set unless the
    /// percent drops below 100, which clears it.
    pub async fn upsert(
        pool: &PgPool,
        learner_id: DbId,
        product_id: DbId,
        overall_percent: i16,
        completed_at: Option<Timestamp>,
    ) -> Result<CourseCompletion, sqlx::Error> {
        let query = format!(
            "INSERT INTO learner_course_completions
                (learner_id, product_id, overall_percent, completed_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (learner_id, product_id) DO UPDATE SET
                overall_percent = EXCLUDED.overall_percent,
                completed_at = CASE
                    WHEN EXCLUDED.overall_percent < 100 THEN NULL
                    ELSE COALESCE(learner_course_completions.completed_at, EXCLUDED.completed_at)
                END,
                updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CourseCompletion>(&query)
            .bind(learner_id)
            .bind(product_id)
            .bind(overall_percent)
            .bind(completed_at)
            .fetch_one(pool)
            .await
    }
}
