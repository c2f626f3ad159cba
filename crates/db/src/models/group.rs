//! Learner group and module permission models and DTOs.

use drip_core::permissions::ModulePermission;
use drip_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `learner_groups` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LearnerGroup {
    pub id: DbId,
    pub product_id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `module_permissions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ModulePermissionRow {
    pub group_id: DbId,
    pub module_id: DbId,
    pub has_access: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ModulePermissionRow {
    pub fn to_permission(&self) -> ModulePermission {
        ModulePermission {
            group_id: self.group_id,
            module_id: self.module_id,
            has_access: self.has_access,
        }
    }
}

/// DTO for creating a learner group.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateLearnerGroup {
    pub product_id: DbId,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

/// DTO for granting or revoking a group's access to a module.
#[derive(Debug, Clone, Deserialize)]
pub struct SetModulePermission {
    pub module_id: DbId,
    pub has_access: bool,
}
