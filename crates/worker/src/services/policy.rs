//! Release policy administration.

use std::collections::HashMap;
use std::sync::Arc;

use drip_core::error::CoreError;
use drip_core::prerequisites::validate_prerequisite;
use drip_core::release::{ReleasePolicy, StoredReleasePolicy};
use drip_core::store::{CatalogStore, PolicyStore};
use drip_core::types::DbId;
use drip_db::models::release_policy::UpsertReleasePolicy;
use validator::Validate;

pub struct PolicyService<S> {
    store: Arc<S>,
}

impl<S> PolicyService<S>
where
    S: CatalogStore + PolicyStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Attach or replace a content item's release policy.
    ///
    /// `after_content` prerequisites must exist in the same product and
    /// must not close a cycle.
    pub async fn set_policy(
        &self,
        content_id: DbId,
        input: &UpsertReleasePolicy,
    ) -> Result<StoredReleasePolicy, CoreError> {
        input
            .validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        let policy = input.to_policy()?;
        let product_id = self.product_of_content(content_id).await?;

        if let ReleasePolicy::AfterContent { prerequisite_id } = policy {
            let prerequisite_product = self.product_of_content(prerequisite_id).await?;
            let product_of = HashMap::from([
                (content_id, product_id),
                (prerequisite_id, prerequisite_product),
            ]);
            let policies = self.current_policies(product_id).await?;
            validate_prerequisite(content_id, prerequisite_id, &product_of, &policies)?;
        }

        let stored = self.store.save_release_policy(content_id, &policy).await?;
        tracing::info!(
            content_id,
            product_id,
            release_type = policy.release_type(),
            "Release policy saved"
        );
        Ok(stored)
    }

    /// Remove a content item's policy, making it immediately available.
    pub async fn clear_policy(&self, content_id: DbId) -> Result<bool, CoreError> {
        let removed = self.store.delete_release_policy(content_id).await?;
        if removed {
            tracing::info!(content_id, "Release policy cleared");
        }
        Ok(removed)
    }

    async fn product_of_content(&self, content_id: DbId) -> Result<DbId, CoreError> {
        let not_found = CoreError::NotFound {
            entity: "content",
            id: content_id,
        };
        let Some(content) = self.store.find_content(content_id).await? else {
            return Err(not_found);
        };
        self.store
            .product_of_module(content.module_id)
            .await?
            .ok_or(not_found)
    }

    /// The product's parseable policies. Malformed rows never unlock
    /// anything, so they cannot take part in a cycle either.
    async fn current_policies(
        &self,
        product_id: DbId,
    ) -> Result<HashMap<DbId, ReleasePolicy>, CoreError> {
        let stored = self.store.list_release_policies(product_id).await?;
        let mut policies = HashMap::with_capacity(stored.len());
        for row in stored {
            match row.parse() {
                Ok(policy) => {
                    policies.insert(row.content_id, policy);
                }
                Err(e) => tracing::warn!(
                    content_id = row.content_id,
                    error = %e,
                    "Skipping malformed release policy"
                ),
            }
        }
        Ok(policies)
    }
}
