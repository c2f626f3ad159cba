//! Per-product completion state model.

use drip_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `learner_course_completions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CourseCompletion {
    pub learner_id: DbId,
    pub product_id: DbId,
    pub overall_percent: i16,
    pub completed_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}
