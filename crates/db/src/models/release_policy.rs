//! Drip release policy row model and DTOs.

use drip_core::error::CoreError;
use drip_core::release::{ReleasePolicy, StoredReleasePolicy};
use drip_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `content_release_policies` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ContentReleasePolicy {
    pub content_id: DbId,
    pub release_type: String,
    pub days: Option<i32>,
    pub fixed_date: Option<Timestamp>,
    pub prerequisite_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ContentReleasePolicy {
    pub fn to_stored(&self) -> StoredReleasePolicy {
        StoredReleasePolicy {
            content_id: self.content_id,
            release_type: self.release_type.clone(),
            days: self.days,
            fixed_date: self.fixed_date,
            prerequisite_id: self.prerequisite_id,
        }
    }
}

/// DTO for attaching or replacing a content item's release policy.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpsertReleasePolicy {
    #[validate(length(min = 1))]
    pub release_type: String,
    #[validate(range(min = 1, max = 3650))]
    pub days: Option<i32>,
    pub fixed_date: Option<Timestamp>,
    pub prerequisite_id: Option<DbId>,
}

impl UpsertReleasePolicy {
    /// Parse into the engine's sum type.
    pub fn to_policy(&self) -> Result<ReleasePolicy, CoreError> {
        ReleasePolicy::from_columns(
            &self.release_type,
            self.days,
            self.fixed_date,
            self.prerequisite_id,
        )
    }
}
