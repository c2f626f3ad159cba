//! Course module entity model and DTOs.

use drip_core::progress::ModuleItem;
use drip_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `modules` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Module {
    pub id: DbId,
    pub product_id: DbId,
    pub name: String,
    pub position: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Module {
    pub fn to_item(&self) -> ModuleItem {
        ModuleItem {
            id: self.id,
            product_id: self.product_id,
            position: self.position,
        }
    }
}

/// DTO for creating a module. It is appended after the last position.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateModule {
    pub product_id: DbId,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
}
