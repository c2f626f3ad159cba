//! In-memory store used by the service tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use drip_core::error::CoreError;
use drip_core::permissions::ModulePermission;
use drip_core::progress::{ContentItem, ModuleItem, ProgressRecord};
use drip_core::release::{ReleasePolicy, StoredReleasePolicy};
use drip_core::store::{CatalogStore, CompletionStore, OrderStore, PolicyStore, ProgressStore};
use drip_core::types::{DbId, Timestamp};

#[derive(Debug, Default)]
pub struct State {
    pub modules: Vec<ModuleItem>,
    pub contents: Vec<ContentItem>,
    pub policies: HashMap<DbId, StoredReleasePolicy>,
    pub purchases: HashMap<(DbId, DbId), Timestamp>,
    pub groups: HashMap<(DbId, DbId), Vec<DbId>>,
    pub permissions: Vec<ModulePermission>,
    pub progress: HashMap<(DbId, DbId), ProgressRecord>,
    pub completions: HashMap<(DbId, DbId), (u8, Option<Timestamp>)>,
    pub fail_order_writes: bool,
    pub order_writes: usize,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    pub state: Mutex<State>,
}

impl MemoryStore {
    /// One product (id 1) with two modules of two 100-second contents each.
    ///
    /// Module 10 holds contents 100 and 101, module 11 holds 110 and 111.
    pub fn course() -> Self {
        let store = Self::default();
        {
            let mut state = store.state.lock().unwrap();
            for (position, module_id) in [10, 11].into_iter().enumerate() {
                state.modules.push(ModuleItem {
                    id: module_id,
                    product_id: 1,
                    position: position as i32 + 1,
                });
                for offset in 0..2 {
                    state.contents.push(ContentItem {
                        id: module_id * 10 + offset,
                        module_id,
                        position: offset as i32 + 1,
                        duration_seconds: Some(100),
                        is_active: true,
                    });
                }
            }
        }
        store
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    fn product_of_content(state: &State, content_id: DbId) -> Option<DbId> {
        let content = state.contents.iter().find(|c| c.id == content_id)?;
        state
            .modules
            .iter()
            .find(|m| m.id == content.module_id)
            .map(|m| m.product_id)
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn list_progress(
        &self,
        learner_id: DbId,
        product_id: DbId,
    ) -> Result<Vec<ProgressRecord>, CoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .progress
            .values()
            .filter(|r| {
                r.learner_id == learner_id
                    && Self::product_of_content(&state, r.content_id) == Some(product_id)
            })
            .cloned()
            .collect())
    }

    async fn find_progress(
        &self,
        learner_id: DbId,
        content_id: DbId,
    ) -> Result<Option<ProgressRecord>, CoreError> {
        Ok(self.with(|s| s.progress.get(&(learner_id, content_id)).cloned()))
    }

    async fn save_progress(&self, record: &ProgressRecord) -> Result<ProgressRecord, CoreError> {
        Ok(self.with(|s| {
            let key = (record.learner_id, record.content_id);
            let merged = match s.progress.get(&key) {
                Some(existing) => ProgressRecord {
                    watch_time_seconds: existing.watch_time_seconds.max(record.watch_time_seconds),
                    completed_at: existing.completed_at.or(record.completed_at),
                    updated_at: existing.updated_at.max(record.updated_at),
                    ..record.clone()
                },
                None => record.clone(),
            };
            s.progress.insert(key, merged.clone());
            merged
        }))
    }

    async fn set_completion(
        &self,
        learner_id: DbId,
        content_id: DbId,
        completed_at: Option<Timestamp>,
    ) -> Result<Option<ProgressRecord>, CoreError> {
        Ok(self.with(|s| {
            if !s.contents.iter().any(|c| c.id == content_id) {
                return None;
            }
            let now = completed_at.unwrap_or_else(chrono::Utc::now);
            let record = s
                .progress
                .entry((learner_id, content_id))
                .or_insert_with(|| ProgressRecord {
                    learner_id,
                    content_id,
                    watch_time_seconds: 0,
                    last_position_seconds: 0,
                    completed_at: None,
                    updated_at: now,
                });
            record.completed_at = completed_at;
            record.updated_at = now;
            Some(record.clone())
        }))
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn find_content(&self, content_id: DbId) -> Result<Option<ContentItem>, CoreError> {
        Ok(self.with(|s| s.contents.iter().find(|c| c.id == content_id).cloned()))
    }

    async fn product_of_module(&self, module_id: DbId) -> Result<Option<DbId>, CoreError> {
        Ok(self.with(|s| {
            s.modules
                .iter()
                .find(|m| m.id == module_id)
                .map(|m| m.product_id)
        }))
    }

    async fn list_modules(&self, product_id: DbId) -> Result<Vec<ModuleItem>, CoreError> {
        Ok(self.with(|s| {
            s.modules
                .iter()
                .filter(|m| m.product_id == product_id)
                .cloned()
                .collect()
        }))
    }

    async fn list_contents(&self, product_id: DbId) -> Result<Vec<ContentItem>, CoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .contents
            .iter()
            .filter(|c| Self::product_of_content(&state, c.id) == Some(product_id))
            .cloned()
            .collect())
    }

    async fn list_release_policies(
        &self,
        product_id: DbId,
    ) -> Result<Vec<StoredReleasePolicy>, CoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .policies
            .values()
            .filter(|p| Self::product_of_content(&state, p.content_id) == Some(product_id))
            .cloned()
            .collect())
    }

    async fn purchase_date(
        &self,
        learner_id: DbId,
        product_id: DbId,
    ) -> Result<Option<Timestamp>, CoreError> {
        Ok(self.with(|s| s.purchases.get(&(learner_id, product_id)).copied()))
    }

    async fn learner_groups(
        &self,
        learner_id: DbId,
        product_id: DbId,
    ) -> Result<Vec<DbId>, CoreError> {
        Ok(self.with(|s| {
            s.groups
                .get(&(learner_id, product_id))
                .cloned()
                .unwrap_or_default()
        }))
    }

    async fn module_permissions(
        &self,
        _product_id: DbId,
    ) -> Result<Vec<ModulePermission>, CoreError> {
        Ok(self.with(|s| s.permissions.clone()))
    }
}

#[async_trait]
impl PolicyStore for MemoryStore {
    async fn save_release_policy(
        &self,
        content_id: DbId,
        policy: &ReleasePolicy,
    ) -> Result<StoredReleasePolicy, CoreError> {
        let stored = StoredReleasePolicy {
            content_id,
            release_type: policy.release_type().to_string(),
            days: policy.days(),
            fixed_date: policy.fixed_date(),
            prerequisite_id: policy.prerequisite_id(),
        };
        self.with(|s| s.policies.insert(content_id, stored.clone()));
        Ok(stored)
    }

    async fn delete_release_policy(&self, content_id: DbId) -> Result<bool, CoreError> {
        Ok(self.with(|s| s.policies.remove(&content_id).is_some()))
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn save_module_order(
        &self,
        _product_id: DbId,
        modules: &[ModuleItem],
    ) -> Result<(), CoreError> {
        self.with(|s| {
            if s.fail_order_writes {
                return Err(CoreError::Storage("order write rejected".to_string()));
            }
            s.order_writes += 1;
            for item in modules {
                if let Some(m) = s.modules.iter_mut().find(|m| m.id == item.id) {
                    m.position = item.position;
                }
            }
            Ok(())
        })
    }

    async fn save_content_order(
        &self,
        _module_id: DbId,
        contents: &[ContentItem],
    ) -> Result<(), CoreError> {
        self.with(|s| {
            if s.fail_order_writes {
                return Err(CoreError::Storage("order write rejected".to_string()));
            }
            s.order_writes += 1;
            for item in contents {
                if let Some(c) = s.contents.iter_mut().find(|c| c.id == item.id) {
                    c.position = item.position;
                }
            }
            Ok(())
        })
    }
}

#[async_trait]
impl CompletionStore for MemoryStore {
    async fn last_percent(
        &self,
        learner_id: DbId,
        product_id: DbId,
    ) -> Result<Option<u8>, CoreError> {
        Ok(self.with(|s| s.completions.get(&(learner_id, product_id)).map(|(p, _)| *p)))
    }

    async fn record_percent(
        &self,
        learner_id: DbId,
        product_id: DbId,
        percent: u8,
        completed_at: Option<Timestamp>,
    ) -> Result<(), CoreError> {
        self.with(|s| {
            let entry = s
                .completions
                .entry((learner_id, product_id))
                .or_insert((percent, None));
            entry.0 = percent;
            entry.1 = if percent >= 100 {
                entry.1.or(completed_at)
            } else {
                None
            };
        });
        Ok(())
    }

    async fn list_active_since(&self, since: Timestamp) -> Result<Vec<(DbId, DbId)>, CoreError> {
        let state = self.state.lock().unwrap();
        let mut pairs: Vec<(DbId, DbId)> = state
            .progress
            .values()
            .filter(|r| r.updated_at > since)
            .filter_map(|r| {
                Self::product_of_content(&state, r.content_id).map(|p| (r.learner_id, p))
            })
            .collect();
        pairs.sort_unstable();
        pairs.dedup();
        Ok(pairs)
    }
}
