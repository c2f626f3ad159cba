//! Progress writes: player ticks and explicit completion toggles.

use std::sync::Arc;

use chrono::Utc;
use drip_core::config::EngineConfig;
use drip_core::error::CoreError;
use drip_core::progress::{
    content_progress_percent, merge_progress_tick, ContentItem, OverallAggregate, ProgressRecord,
    ProgressTick,
};
use drip_core::store::{CatalogStore, CompletionStore, ProgressStore};
use drip_core::types::DbId;
use drip_events::bus::{EVENT_CONTENT_COMPLETION_CHANGED, EVENT_PROGRESS_UPDATED};
use drip_events::{EventBus, LearnerEvent};
use serde::Serialize;

use super::completion::CompletionService;

/// Result of a progress write.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressUpdate {
    pub record: ProgressRecord,
    pub content_percent: u8,
    pub overall: OverallAggregate,
}

pub struct ProgressService<S> {
    store: Arc<S>,
    bus: Arc<EventBus>,
    completion: Arc<CompletionService<S>>,
    config: EngineConfig,
}

impl<S> ProgressService<S>
where
    S: CatalogStore + ProgressStore + CompletionStore,
{
    pub fn new(
        store: Arc<S>,
        bus: Arc<EventBus>,
        completion: Arc<CompletionService<S>>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            bus,
            completion,
            config,
        }
    }

    /// Merge a player report into the learner's record for the content.
    pub async fn record_tick(&self, tick: &ProgressTick) -> Result<ProgressUpdate, CoreError> {
        if tick.watch_time_seconds < 0 || tick.last_position_seconds < 0 {
            return Err(CoreError::Validation(
                "Watch time and position must not be negative".to_string(),
            ));
        }

        let (content, product_id) = self.active_content(tick.content_id).await?;
        let now = Utc::now();

        let existing = self
            .store
            .find_progress(tick.learner_id, tick.content_id)
            .await?;
        let merged = merge_progress_tick(
            existing.as_ref(),
            tick,
            content.duration_seconds,
            self.config.completion_threshold,
            now,
        );
        let saved = self.store.save_progress(&merged).await?;
        let content_percent = content_progress_percent(
            saved.watch_time_seconds,
            content.duration_seconds.map(i64::from),
        );

        let newly_completed =
            saved.is_completed() && !existing.as_ref().is_some_and(ProgressRecord::is_completed);
        if newly_completed {
            tracing::debug!(
                learner_id = tick.learner_id,
                content_id = tick.content_id,
                "Content crossed completion threshold"
            );
        }

        self.bus.publish(
            LearnerEvent::new(EVENT_PROGRESS_UPDATED, tick.learner_id, product_id)
                .with_content(tick.content_id)
                .with_payload(serde_json::json!({
                    "watch_time_seconds": saved.watch_time_seconds,
                    "last_position_seconds": saved.last_position_seconds,
                    "content_percent": content_percent,
                    "completed": saved.is_completed(),
                })),
        );

        let overall = self.completion.evaluate(tick.learner_id, product_id, now).await?;
        Ok(ProgressUpdate {
            record: saved,
            content_percent,
            overall,
        })
    }

    /// Explicitly mark a content item complete.
    pub async fn mark_complete(
        &self,
        learner_id: DbId,
        content_id: DbId,
    ) -> Result<ProgressUpdate, CoreError> {
        self.set_completion(learner_id, content_id, true).await
    }

    /// Clear a content item's completion.
    pub async fn unmark_complete(
        &self,
        learner_id: DbId,
        content_id: DbId,
    ) -> Result<ProgressUpdate, CoreError> {
        self.set_completion(learner_id, content_id, false).await
    }

    async fn set_completion(
        &self,
        learner_id: DbId,
        content_id: DbId,
        completed: bool,
    ) -> Result<ProgressUpdate, CoreError> {
        let (content, product_id) = self.active_content(content_id).await?;
        let now = Utc::now();

        let record = self
            .store
            .set_completion(learner_id, content_id, completed.then_some(now))
            .await?
            .ok_or(CoreError::NotFound {
                entity: "content",
                id: content_id,
            })?;

        tracing::info!(learner_id, content_id, completed, "Content completion set");
        self.bus.publish(
            LearnerEvent::new(EVENT_CONTENT_COMPLETION_CHANGED, learner_id, product_id)
                .with_content(content_id)
                .with_payload(serde_json::json!({ "completed": completed })),
        );

        let overall = self.completion.evaluate(learner_id, product_id, now).await?;
        Ok(ProgressUpdate {
            content_percent: content_progress_percent(
                record.watch_time_seconds,
                content.duration_seconds.map(i64::from),
            ),
            record,
            overall,
        })
    }

    /// Look up an active content item and its product.
    async fn active_content(&self, content_id: DbId) -> Result<(ContentItem, DbId), CoreError> {
        let content = self
            .store
            .find_content(content_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "content",
                id: content_id,
            })?;
        if !content.is_active {
            return Err(CoreError::Validation(format!(
                "Content {content_id} is no longer active"
            )));
        }
        let product_id = self
            .store
            .product_of_module(content.module_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "module",
                id: content.module_id,
            })?;
        Ok((content, product_id))
    }
}
