//! Learner progress row models.

use drip_core::progress::ProgressRecord;
use drip_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `content_progress` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ContentProgress {
    pub id: DbId,
    pub learner_id: DbId,
    pub content_id: DbId,
    pub watch_time_seconds: i64,
    pub last_position_seconds: i64,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ContentProgress {
    pub fn to_record(&self) -> ProgressRecord {
        ProgressRecord {
            learner_id: self.learner_id,
            content_id: self.content_id,
            watch_time_seconds: self.watch_time_seconds,
            last_position_seconds: self.last_position_seconds,
            completed_at: self.completed_at,
            updated_at: self.updated_at,
        }
    }
}

/// A (learner, product) pair with progress activity, used by the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize)]
pub struct LearnerProductActivity {
    pub learner_id: DbId,
    pub product_id: DbId,
}
