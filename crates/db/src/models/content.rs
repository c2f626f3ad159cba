//! Content item entity model and DTOs.
//!
//! Content is soft-deactivated (`is_active = false`) rather than deleted
//! while progress rows reference it.

use drip_core::progress::ContentItem;
use drip_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `contents` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Content {
    pub id: DbId,
    pub module_id: DbId,
    pub title: String,
    pub position: i32,
    pub duration_seconds: Option<i32>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Content {
    pub fn to_item(&self) -> ContentItem {
        ContentItem {
            id: self.id,
            module_id: self.module_id,
            position: self.position,
            duration_seconds: self.duration_seconds,
            is_active: self.is_active,
        }
    }
}

/// DTO for creating a content item. It is appended after the last position.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateContent {
    pub module_id: DbId,
    #[validate(length(min = 1, max = 300))]
    pub title: String,
    #[validate(range(min = 0))]
    pub duration_seconds: Option<i32>,
}

/// DTO for editing a content item. All fields optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateContent {
    #[validate(length(min = 1, max = 300))]
    pub title: Option<String>,
    #[validate(range(min = 0))]
    pub duration_seconds: Option<i32>,
}
