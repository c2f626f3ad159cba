//! Repository for `learner_groups`, `learner_group_members` and
//! `module_permissions`.

use drip_core::types::DbId;
use sqlx::PgPool;

use crate::models::group::{
    CreateLearnerGroup, LearnerGroup, ModulePermissionRow, SetModulePermission,
};

const GROUP_COLUMNS: &str = "id, product_id, name, created_at, updated_at";

const PERMISSION_COLUMNS: &str = "group_id, module_id, has_access, created_at, updated_at";

/// Provides group membership and module permission operations.
pub struct GroupRepo;

impl GroupRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateLearnerGroup,
    ) -> Result<LearnerGroup, sqlx::Error> {
        let query = format!(
            "INSERT INTO learner_groups (product_id, name) VALUES ($1, $2) RETURNING {GROUP_COLUMNS}"
        );
        sqlx::query_as::<_, LearnerGroup>(&query)
            .bind(input.product_id)
            .bind(&input.name)
            .fetch_one(pool)
            .await
    }

    /// Add a learner to a group. Adding twice is a no-op.
    pub async fn add_member(
        pool: &PgPool,
        group_id: DbId,
        learner_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO learner_group_members (group_id, learner_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(group_id)
        .bind(learner_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn remove_member(
        pool: &PgPool,
        group_id: DbId,
        learner_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM learner_group_members WHERE group_id = $1 AND learner_id = $2",
        )
        .bind(group_id)
        .bind(learner_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Ids of the product's groups the learner belongs to.
    pub async fn list_learner_group_ids(
        pool: &PgPool,
        learner_id: DbId,
        product_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT g.id FROM learner_groups g
             JOIN learner_group_members gm ON gm.group_id = g.id
             WHERE gm.learner_id = $1 AND g.product_id = $2
             ORDER BY g.id",
        )
        .bind(learner_id)
        .bind(product_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Grant or revoke a group's access to a module.
    pub async fn set_permission(
        pool: &PgPool,
        group_id: DbId,
        input: &SetModulePermission,
    ) -> Result<ModulePermissionRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO module_permissions (group_id, module_id, has_access)
             VALUES ($1, $2, $3)
             ON CONFLICT (group_id, module_id) DO UPDATE SET
                has_access = EXCLUDED.has_access
             RETURNING {PERMISSION_COLUMNS}"
        );
        sqlx::query_as::<_, ModulePermissionRow>(&query)
            .bind(group_id)
            .bind(input.module_id)
            .bind(input.has_access)
            .fetch_one(pool)
            .await
    }

    /// Remove an explicit permission row, returning the group to its default.
    pub async fn clear_permission(
        pool: &PgPool,
        group_id: DbId,
        module_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM module_permissions WHERE group_id = $1 AND module_id = $2")
                .bind(group_id)
                .bind(module_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Every permission row for the modules of a product.
    pub async fn list_permissions_by_product(
        pool: &PgPool,
        product_id: DbId,
    ) -> Result<Vec<ModulePermissionRow>, sqlx::Error> {
        sqlx::query_as::<_, ModulePermissionRow>(
            "SELECT mp.group_id, mp.module_id, mp.has_access, mp.created_at, mp.updated_at
             FROM module_permissions mp
             JOIN modules m ON m.id = mp.module_id
             WHERE m.product_id = $1
             ORDER BY mp.module_id, mp.group_id",
        )
        .bind(product_id)
        .fetch_all(pool)
        .await
    }
}
