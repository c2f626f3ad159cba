//! Repository for the `content_progress` table.

use drip_core::progress::ProgressRecord;
use drip_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::progress::{ContentProgress, LearnerProductActivity};

/// Column list for content_progress queries.
const COLUMNS: &str = "id, learner_id, content_id, watch_time_seconds, last_position_seconds, \
    completed_at, created_at, updated_at";

/// Provides reads and max-wins writes of learner progress.
pub struct ProgressRepo;

impl ProgressRepo {
    pub async fn find(
        pool: &PgPool,
        learner_id: DbId,
        content_id: DbId,
    ) -> Result<Option<ContentProgress>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM content_progress WHERE learner_id = $1 AND content_id = $2"
        );
        sqlx::query_as::<_, ContentProgress>(&query)
            .bind(learner_id)
            .bind(content_id)
            .fetch_optional(pool)
            .await
    }

    /// A learner's records for every content item of a product.
    pub async fn list_by_learner_product(
        pool: &PgPool,
        learner_id: DbId,
        product_id: DbId,
    ) -> Result<Vec<ContentProgress>, sqlx::Error> {
        sqlx::query_as::<_, ContentProgress>(
            "SELECT p.id, p.learner_id, p.content_id, p.watch_time_seconds,
                    p.last_position_seconds, p.completed_at, p.created_at, p.updated_at
             FROM content_progress p
             JOIN contents c ON c.id = p.content_id
             JOIN modules m ON m.id = c.module_id
             WHERE p.learner_id = $1 AND m.product_id = $2
             ORDER BY p.updated_at, p.id",
        )
        .bind(learner_id)
        .bind(product_id)
        .fetch_all(pool)
        .await
    }

    /// Insert or merge a progress record.
    ///
    /// Concurrent writers resolve max-wins: watch time and the activity
    /// timestamp never regress, and an existing completion is kept.
    pub async fn upsert(
        pool: &PgPool,
        record: &ProgressRecord,
    ) -> Result<ContentProgress, sqlx::Error> {
        let query = format!(
            "INSERT INTO content_progress
                (learner_id, content_id, watch_time_seconds, last_position_seconds,
                 completed_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (learner_id, content_id) DO UPDATE SET
                watch_time_seconds = GREATEST(content_progress.watch_time_seconds,
                                              EXCLUDED.watch_time_seconds),
                last_position_seconds = EXCLUDED.last_position_seconds,
                completed_at = COALESCE(content_progress.completed_at, EXCLUDED.completed_at),
                updated_at = GREATEST(content_progress.updated_at, EXCLUDED.updated_at)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ContentProgress>(&query)
            .bind(record.learner_id)
            .bind(record.content_id)
            .bind(record.watch_time_seconds)
            .bind(record.last_position_seconds)
            .bind(record.completed_at)
            .bind(record.updated_at)
            .fetch_one(pool)
            .await
    }

    /// Explicitly mark (`Some`) or unmark (`None`) a content item complete.
    ///
    /// Creates the record when the learner has never touched the content.
    pub async fn set_completion(
        pool: &PgPool,
        learner_id: DbId,
        content_id: DbId,
        completed_at: Option<Timestamp>,
        now: Timestamp,
    ) -> Result<ContentProgress, sqlx::Error> {
        let query = format!(
            "INSERT INTO content_progress (learner_id, content_id, completed_at, updated_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (learner_id, content_id) DO UPDATE SET
                completed_at = EXCLUDED.completed_at,
                updated_at = EXCLUDED.updated_at
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ContentProgress>(&query)
            .bind(learner_id)
            .bind(content_id)
            .bind(completed_at)
            .bind(now)
            .fetch_one(pool)
            .await
    }

    /// Distinct (learner, product) pairs with progress updated after `since`.
    pub async fn list_active_since(
        pool: &PgPool,
        since: Timestamp,
    ) -> Result<Vec<LearnerProductActivity>, sqlx::Error> {
        sqlx::query_as::<_, LearnerProductActivity>(
            "SELECT DISTINCT p.learner_id, m.product_id
             FROM content_progress p
             JOIN contents c ON c.id = p.content_id
             JOIN modules m ON m.id = c.module_id
             WHERE p.updated_at > $1
             ORDER BY p.learner_id, m.product_id",
        )
        .bind(since)
        .fetch_all(pool)
        .await
    }
}
