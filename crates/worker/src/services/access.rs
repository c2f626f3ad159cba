//! Learner-facing access queries.

use std::sync::Arc;

use drip_core::access::{evaluate_product_access, LearnerContext, ProductCatalog};
use drip_core::config::EngineConfig;
use drip_core::error::CoreError;
use drip_core::release::AccessDecision;
use drip_core::store::{CatalogStore, ProgressStore};
use drip_core::types::{DbId, Timestamp};

pub struct AccessService<S> {
    store: Arc<S>,
    config: EngineConfig,
}

impl<S> AccessService<S>
where
    S: CatalogStore + ProgressStore,
{
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Access decisions for every active content item of a product.
    pub async fn product_access(
        &self,
        learner_id: DbId,
        product_id: DbId,
        now: Timestamp,
    ) -> Result<Vec<AccessDecision>, CoreError> {
        let purchase_date = self.store.purchase_date(learner_id, product_id).await?;
        let groups = self.store.learner_groups(learner_id, product_id).await?;
        let modules = self.store.list_modules(product_id).await?;
        let contents = self.store.list_contents(product_id).await?;
        let policies = self.store.list_release_policies(product_id).await?;
        let permissions = self.store.module_permissions(product_id).await?;
        let records = self.store.list_progress(learner_id, product_id).await?;

        let learner = LearnerContext {
            learner_id,
            purchase_date,
            groups: &groups,
        };
        let catalog = ProductCatalog {
            product_id,
            modules: &modules,
            contents: &contents,
            policies: &policies,
            permissions: &permissions,
        };
        let decisions = evaluate_product_access(
            &learner,
            &catalog,
            &records,
            self.config.prerequisite_mode,
            now,
        );

        tracing::debug!(
            learner_id,
            product_id,
            contents = decisions.len(),
            accessible = decisions.iter().filter(|d| d.is_accessible).count(),
            "Evaluated product access"
        );
        Ok(decisions)
    }

    /// Access decision for a single content item.
    ///
    /// Evaluated against the whole product so prerequisite chains and
    /// group visibility see the same data as [`Self::product_access`].
    pub async fn content_access(
        &self,
        learner_id: DbId,
        content_id: DbId,
        now: Timestamp,
    ) -> Result<AccessDecision, CoreError> {
        let not_found = CoreError::NotFound {
            entity: "content",
            id: content_id,
        };
        let Some(content) = self.store.find_content(content_id).await? else {
            return Err(not_found);
        };
        let Some(product_id) = self.store.product_of_module(content.module_id).await? else {
            return Err(not_found);
        };

        self.product_access(learner_id, product_id, now)
            .await?
            .into_iter()
            .find(|d| d.content_id == content_id)
            .ok_or(not_found)
    }
}
