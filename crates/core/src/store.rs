//! Persistence seams consumed by the async services.
//!
//! The engine itself never performs I/O. These traits describe what the
//! orchestration layer needs from the backing store; `drip-db` implements
//! them on PostgreSQL and tests implement them in memory.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::permissions::ModulePermission;
use crate::progress::{ContentItem, ModuleItem, ProgressRecord};
use crate::release::{ReleasePolicy, StoredReleasePolicy};
use crate::types::{DbId, Timestamp};

/// Per-learner, per-content progress records.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// All of a learner's records for contents of a product.
    async fn list_progress(
        &self,
        learner_id: DbId,
        product_id: DbId,
    ) -> Result<Vec<ProgressRecord>, CoreError>;

    async fn find_progress(
        &self,
        learner_id: DbId,
        content_id: DbId,
    ) -> Result<Option<ProgressRecord>, CoreError>;

    /// Upsert a record. Implementations must not regress watch time or
    /// clear an existing completion.
    async fn save_progress(&self, record: &ProgressRecord) -> Result<ProgressRecord, CoreError>;

    /// Explicitly set or clear a completion timestamp.
    async fn set_completion(
        &self,
        learner_id: DbId,
        content_id: DbId,
        completed_at: Option<Timestamp>,
    ) -> Result<Option<ProgressRecord>, CoreError>;
}

/// Product structure, drip policies and membership.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_content(&self, content_id: DbId) -> Result<Option<ContentItem>, CoreError>;

    async fn product_of_module(&self, module_id: DbId) -> Result<Option<DbId>, CoreError>;

    async fn list_modules(&self, product_id: DbId) -> Result<Vec<ModuleItem>, CoreError>;

    async fn list_contents(&self, product_id: DbId) -> Result<Vec<ContentItem>, CoreError>;

    async fn list_release_policies(
        &self,
        product_id: DbId,
    ) -> Result<Vec<StoredReleasePolicy>, CoreError>;

    /// `None` when the learner has not purchased the product.
    async fn purchase_date(
        &self,
        learner_id: DbId,
        product_id: DbId,
    ) -> Result<Option<Timestamp>, CoreError>;

    async fn learner_groups(&self, learner_id: DbId, product_id: DbId)
        -> Result<Vec<DbId>, CoreError>;

    async fn module_permissions(&self, product_id: DbId)
        -> Result<Vec<ModulePermission>, CoreError>;
}

/// Writes to a content item's drip policy.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn save_release_policy(
        &self,
        content_id: DbId,
        policy: &ReleasePolicy,
    ) -> Result<StoredReleasePolicy, CoreError>;

    /// Returns `false` when the content had no policy.
    async fn delete_release_policy(&self, content_id: DbId) -> Result<bool, CoreError>;
}

/// Persisted ordering of modules and contents.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn save_module_order(
        &self,
        product_id: DbId,
        modules: &[ModuleItem],
    ) -> Result<(), CoreError>;

    async fn save_content_order(
        &self,
        module_id: DbId,
        contents: &[ContentItem],
    ) -> Result<(), CoreError>;
}

/// Last observed overall percent per (learner, product).
#[async_trait]
pub trait CompletionStore: Send + Sync {
    async fn last_percent(&self, learner_id: DbId, product_id: DbId)
        -> Result<Option<u8>, CoreError>;

    async fn record_percent(
        &self,
        learner_id: DbId,
        product_id: DbId,
        percent: u8,
        completed_at: Option<Timestamp>,
    ) -> Result<(), CoreError>;

    /// Distinct (learner, product) pairs with progress written after `since`.
    async fn list_active_since(&self, since: Timestamp) -> Result<Vec<(DbId, DbId)>, CoreError>;
}
