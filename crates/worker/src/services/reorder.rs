//! Serialized, optimistic reordering of modules and contents.
//!
//! Each product's module list and each module's content list is an
//! [`OrderedCollection`] behind its own async mutex. A reorder applies the
//! new order, persists it through [`OrderStore`] and confirms, or rolls
//! the collection back when the write fails.

use std::collections::HashMap;
use std::sync::Arc;

use drip_core::error::CoreError;
use drip_core::progress::{ContentItem, ModuleItem};
use drip_core::reorder::OrderedCollection;
use drip_core::store::{CatalogStore, OrderStore};
use drip_core::types::DbId;
use tokio::sync::Mutex;

type Shared<T> = Arc<Mutex<OrderedCollection<T>>>;

pub struct ReorderService<S> {
    store: Arc<S>,
    /// Keyed by product id.
    modules: Mutex<HashMap<DbId, Shared<ModuleItem>>>,
    /// Keyed by module id.
    contents: Mutex<HashMap<DbId, Shared<ContentItem>>>,
}

impl<S> ReorderService<S>
where
    S: CatalogStore + OrderStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            modules: Mutex::new(HashMap::new()),
            contents: Mutex::new(HashMap::new()),
        }
    }

    /// Reorder a product's modules. `order` must list every module id once.
    pub async fn reorder_modules(
        &self,
        product_id: DbId,
        order: &[DbId],
    ) -> Result<Vec<ModuleItem>, CoreError> {
        let shared = self.module_collection(product_id).await?;
        let mut collection = shared.lock().await;

        let token = match collection.begin_reorder(order) {
            Ok(token) => token,
            Err(CoreError::Validation(_)) => {
                // The cached list may predate a module being added or removed.
                *collection = OrderedCollection::new(self.load_modules(product_id).await?);
                collection.begin_reorder(order)?
            }
            Err(e) => return Err(e),
        };

        match self
            .store
            .save_module_order(product_id, collection.items())
            .await
        {
            Ok(()) => {
                collection.confirm(token)?;
                tracing::info!(product_id, modules = order.len(), "Modules reordered");
                Ok(collection.items().to_vec())
            }
            Err(e) => {
                collection.rollback(token)?;
                tracing::warn!(product_id, error = %e, "Module reorder rolled back");
                Err(e)
            }
        }
    }

    /// Reorder a module's contents. `order` must list every content id once.
    pub async fn reorder_contents(
        &self,
        module_id: DbId,
        order: &[DbId],
    ) -> Result<Vec<ContentItem>, CoreError> {
        let shared = self.content_collection(module_id).await?;
        let mut collection = shared.lock().await;

        let token = match collection.begin_reorder(order) {
            Ok(token) => token,
            Err(CoreError::Validation(_)) => {
                *collection = OrderedCollection::new(self.load_contents(module_id).await?);
                collection.begin_reorder(order)?
            }
            Err(e) => return Err(e),
        };

        match self
            .store
            .save_content_order(module_id, collection.items())
            .await
        {
            Ok(()) => {
                collection.confirm(token)?;
                tracing::info!(module_id, contents = order.len(), "Contents reordered");
                Ok(collection.items().to_vec())
            }
            Err(e) => {
                collection.rollback(token)?;
                tracing::warn!(module_id, error = %e, "Content reorder rolled back");
                Err(e)
            }
        }
    }

    /// Current module order as last confirmed.
    pub async fn modules(&self, product_id: DbId) -> Result<Vec<ModuleItem>, CoreError> {
        let shared = self.module_collection(product_id).await?;
        let collection = shared.lock().await;
        Ok(collection.items().to_vec())
    }

    /// Current content order as last confirmed.
    pub async fn contents(&self, module_id: DbId) -> Result<Vec<ContentItem>, CoreError> {
        let shared = self.content_collection(module_id).await?;
        let collection = shared.lock().await;
        Ok(collection.items().to_vec())
    }

    async fn module_collection(&self, product_id: DbId) -> Result<Shared<ModuleItem>, CoreError> {
        let mut cache = self.modules.lock().await;
        if let Some(shared) = cache.get(&product_id) {
            return Ok(shared.clone());
        }
        let shared = Arc::new(Mutex::new(OrderedCollection::new(
            self.load_modules(product_id).await?,
        )));
        cache.insert(product_id, shared.clone());
        Ok(shared)
    }

    async fn content_collection(&self, module_id: DbId) -> Result<Shared<ContentItem>, CoreError> {
        let mut cache = self.contents.lock().await;
        if let Some(shared) = cache.get(&module_id) {
            return Ok(shared.clone());
        }
        let shared = Arc::new(Mutex::new(OrderedCollection::new(
            self.load_contents(module_id).await?,
        )));
        cache.insert(module_id, shared.clone());
        Ok(shared)
    }

    async fn load_modules(&self, product_id: DbId) -> Result<Vec<ModuleItem>, CoreError> {
        self.store.list_modules(product_id).await
    }

    /// Includes deactivated contents; they keep their positions.
    async fn load_contents(&self, module_id: DbId) -> Result<Vec<ContentItem>, CoreError> {
        let product_id = self
            .store
            .product_of_module(module_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "module",
                id: module_id,
            })?;
        let contents = self.store.list_contents(product_id).await?;
        Ok(contents
            .into_iter()
            .filter(|c| c.module_id == module_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use assert_matches::assert_matches;

    fn ids<T: drip_core::reorder::Positioned>(items: &[T]) -> Vec<DbId> {
        items.iter().map(|i| i.id()).collect()
    }

    #[tokio::test]
    async fn reorder_persists_and_renumbers() {
        let store = Arc::new(MemoryStore::course());
        let service = ReorderService::new(store.clone());

        let modules = service.reorder_modules(1, &[11, 10]).await.unwrap();
        assert_eq!(ids(&modules), vec![11, 10]);
        assert_eq!(modules[0].position, 1);

        let stored = store.with(|s| s.modules.iter().find(|m| m.id == 11).map(|m| m.position));
        assert_eq!(stored, Some(1));
    }

    #[tokio::test]
    async fn failed_write_rolls_back() {
        let store = Arc::new(MemoryStore::course());
        let service = ReorderService::new(store.clone());
        store.with(|s| s.fail_order_writes = true);

        assert_matches!(
            service.reorder_contents(10, &[101, 100]).await,
            Err(CoreError::Storage(_))
        );
        let contents = service.contents(10).await.unwrap();
        assert_eq!(ids(&contents), vec![100, 101]);
    }

    #[tokio::test]
    async fn rejects_partial_order() {
        let store = Arc::new(MemoryStore::course());
        let service = ReorderService::new(store);

        assert_matches!(
            service.reorder_contents(10, &[101]).await,
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            service.reorder_contents(10, &[101, 101]).await,
            Err(CoreError::Validation(_))
        );
    }

    #[tokio::test]
    async fn reloads_stale_collection() {
        let store = Arc::new(MemoryStore::course());
        let service = ReorderService::new(store.clone());
        service.contents(10).await.unwrap();

        store.with(|s| {
            s.contents.push(ContentItem {
                id: 102,
                module_id: 10,
                position: 3,
                duration_seconds: None,
                is_active: true,
            })
        });

        let contents = service.reorder_contents(10, &[102, 100, 101]).await.unwrap();
        assert_eq!(ids(&contents), vec![102, 100, 101]);
    }

    #[tokio::test]
    async fn unknown_module_is_not_found() {
        let store = Arc::new(MemoryStore::course());
        let service = ReorderService::new(store);
        assert_matches!(
            service.reorder_contents(99, &[]).await,
            Err(CoreError::NotFound { entity: "module", .. })
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reorders_are_serialized() {
        let store = Arc::new(MemoryStore::course());
        let service = Arc::new(ReorderService::new(store.clone()));

        let handles: Vec<_> = [vec![101, 100], vec![100, 101], vec![101, 100]]
            .into_iter()
            .map(|order| {
                let service = service.clone();
                tokio::spawn(async move { service.reorder_contents(10, &order).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.with(|s| s.order_writes), 3);
        let positions: Vec<i32> = store.with(|s| {
            let mut p: Vec<i32> = s
                .contents
                .iter()
                .filter(|c| c.module_id == 10)
                .map(|c| c.position)
                .collect();
            p.sort_unstable();
            p
        });
        assert_eq!(positions, vec![1, 2]);
    }
}
