//! PostgreSQL implementation of the `drip-core` store traits.

use async_trait::async_trait;
use drip_core::error::CoreError;
use drip_core::permissions::ModulePermission;
use drip_core::progress::{ContentItem, ModuleItem, ProgressRecord};
use drip_core::release::{ReleasePolicy, StoredReleasePolicy};
use drip_core::store::{CatalogStore, CompletionStore, OrderStore, PolicyStore, ProgressStore};
use drip_core::types::{DbId, Timestamp};

use crate::repositories::{
    CompletionRepo, ContentRepo, GroupRepo, ModuleRepo, ProgressRepo, PurchaseRepo,
    ReleasePolicyRepo,
};
use crate::DbPool;

/// Store adapter over a connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn storage(op: &'static str) -> impl FnOnce(sqlx::Error) -> CoreError {
    move |e| {
        tracing::error!(op, error = %e, "Store query failed");
        CoreError::Storage(format!("{op}: {e}"))
    }
}

#[async_trait]
impl ProgressStore for PgStore {
    async fn list_progress(
        &self,
        learner_id: DbId,
        product_id: DbId,
    ) -> Result<Vec<ProgressRecord>, CoreError> {
        let rows = ProgressRepo::list_by_learner_product(&self.pool, learner_id, product_id)
            .await
            .map_err(storage("list_progress"))?;
        Ok(rows.iter().map(|r| r.to_record()).collect())
    }

    async fn find_progress(
        &self,
        learner_id: DbId,
        content_id: DbId,
    ) -> Result<Option<ProgressRecord>, CoreError> {
        let row = ProgressRepo::find(&self.pool, learner_id, content_id)
            .await
            .map_err(storage("find_progress"))?;
        Ok(row.map(|r| r.to_record()))
    }

    async fn save_progress(&self, record: &ProgressRecord) -> Result<ProgressRecord, CoreError> {
        let row = ProgressRepo::upsert(&self.pool, record)
            .await
            .map_err(storage("save_progress"))?;
        Ok(row.to_record())
    }

    async fn set_completion(
        &self,
        learner_id: DbId,
        content_id: DbId,
        completed_at: Option<Timestamp>,
    ) -> Result<Option<ProgressRecord>, CoreError> {
        if ContentRepo::find_by_id(&self.pool, content_id)
            .await
            .map_err(storage("set_completion"))?
            .is_none()
        {
            return Ok(None);
        }
        let row = ProgressRepo::set_completion(
            &self.pool,
            learner_id,
            content_id,
            completed_at,
            chrono::Utc::now(),
        )
        .await
        .map_err(storage("set_completion"))?;
        Ok(Some(row.to_record()))
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn find_content(&self, content_id: DbId) -> Result<Option<ContentItem>, CoreError> {
        let row = ContentRepo::find_by_id(&self.pool, content_id)
            .await
            .map_err(storage("find_content"))?;
        Ok(row.map(|c| c.to_item()))
    }

    async fn product_of_module(&self, module_id: DbId) -> Result<Option<DbId>, CoreError> {
        let row = ModuleRepo::find_by_id(&self.pool, module_id)
            .await
            .map_err(storage("product_of_module"))?;
        Ok(row.map(|m| m.product_id))
    }

    async fn list_modules(&self, product_id: DbId) -> Result<Vec<ModuleItem>, CoreError> {
        let rows = ModuleRepo::list_by_product(&self.pool, product_id)
            .await
            .map_err(storage("list_modules"))?;
        Ok(rows.iter().map(|m| m.to_item()).collect())
    }

    async fn list_contents(&self, product_id: DbId) -> Result<Vec<ContentItem>, CoreError> {
        let rows = ContentRepo::list_by_product(&self.pool, product_id)
            .await
            .map_err(storage("list_contents"))?;
        Ok(rows.iter().map(|c| c.to_item()).collect())
    }

    async fn list_release_policies(
        &self,
        product_id: DbId,
    ) -> Result<Vec<StoredReleasePolicy>, CoreError> {
        let rows = ReleasePolicyRepo::list_by_product(&self.pool, product_id)
            .await
            .map_err(storage("list_release_policies"))?;
        Ok(rows.iter().map(|p| p.to_stored()).collect())
    }

    async fn purchase_date(
        &self,
        learner_id: DbId,
        product_id: DbId,
    ) -> Result<Option<Timestamp>, CoreError> {
        PurchaseRepo::purchase_date(&self.pool, learner_id, product_id)
            .await
            .map_err(storage("purchase_date"))
    }

    async fn learner_groups(
        &self,
        learner_id: DbId,
        product_id: DbId,
    ) -> Result<Vec<DbId>, CoreError> {
        GroupRepo::list_learner_group_ids(&self.pool, learner_id, product_id)
            .await
            .map_err(storage("learner_groups"))
    }

    async fn module_permissions(
        &self,
        product_id: DbId,
    ) -> Result<Vec<ModulePermission>, CoreError> {
        let rows = GroupRepo::list_permissions_by_product(&self.pool, product_id)
            .await
            .map_err(storage("module_permissions"))?;
        Ok(rows.iter().map(|p| p.to_permission()).collect())
    }
}

#[async_trait]
impl PolicyStore for PgStore {
    async fn save_release_policy(
        &self,
        content_id: DbId,
        policy: &ReleasePolicy,
    ) -> Result<StoredReleasePolicy, CoreError> {
        let row = ReleasePolicyRepo::upsert(&self.pool, content_id, policy)
            .await
            .map_err(storage("save_release_policy"))?;
        Ok(row.to_stored())
    }

    async fn delete_release_policy(&self, content_id: DbId) -> Result<bool, CoreError> {
        ReleasePolicyRepo::delete(&self.pool, content_id)
            .await
            .map_err(storage("delete_release_policy"))
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn save_module_order(
        &self,
        product_id: DbId,
        modules: &[ModuleItem],
    ) -> Result<(), CoreError> {
        let positions: Vec<(DbId, i32)> = modules.iter().map(|m| (m.id, m.position)).collect();
        ModuleRepo::update_positions(&self.pool, product_id, &positions)
            .await
            .map_err(storage("save_module_order"))
    }

    async fn save_content_order(
        &self,
        module_id: DbId,
        contents: &[ContentItem],
    ) -> Result<(), CoreError> {
        let positions: Vec<(DbId, i32)> = contents.iter().map(|c| (c.id, c.position)).collect();
        ContentRepo::update_positions(&self.pool, module_id, &positions)
            .await
            .map_err(storage("save_content_order"))
    }
}

#[async_trait]
impl CompletionStore for PgStore {
    async fn last_percent(
        &self,
        learner_id: DbId,
        product_id: DbId,
    ) -> Result<Option<u8>, CoreError> {
        let row = CompletionRepo::find(&self.pool, learner_id, product_id)
            .await
            .map_err(storage("last_percent"))?;
        Ok(row.map(|c| c.overall_percent.clamp(0, 100) as u8))
    }

    async fn record_percent(
        &self,
        learner_id: DbId,
        product_id: DbId,
        percent: u8,
        completed_at: Option<Timestamp>,
    ) -> Result<(), CoreError> {
        CompletionRepo::upsert(
            &self.pool,
            learner_id,
            product_id,
            i16::from(percent),
            completed_at,
        )
        .await
        .map_err(storage("record_percent"))?;
        Ok(())
    }

    async fn list_active_since(&self, since: Timestamp) -> Result<Vec<(DbId, DbId)>, CoreError> {
        let rows = ProgressRepo::list_active_since(&self.pool, since)
            .await
            .map_err(storage("list_active_since"))?;
        Ok(rows.iter().map(|a| (a.learner_id, a.product_id)).collect())
    }
}
