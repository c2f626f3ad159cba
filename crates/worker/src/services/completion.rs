//! Course completion detection.
//!
//! Recomputes a learner's overall progress, persists the observed percent
//! and publishes `course.completed` exactly once per transition to 100%.

use std::sync::Arc;

use drip_core::completion::{CompletionTracker, COMPLETE_PERCENT};
use drip_core::error::CoreError;
use drip_core::progress::{overall_progress, OverallAggregate};
use drip_core::store::{CatalogStore, CompletionStore, ProgressStore};
use drip_core::types::{DbId, Timestamp};
use drip_events::{EventBus, LearnerEvent};
use tokio::sync::Mutex;

pub struct CompletionService<S> {
    store: Arc<S>,
    bus: Arc<EventBus>,
    /// Held across the read-compare-record sequence so two writers for
    /// the same learner cannot both observe the transition.
    evaluating: Mutex<()>,
}

impl<S> CompletionService<S>
where
    S: CatalogStore + ProgressStore + CompletionStore,
{
    pub fn new(store: Arc<S>, bus: Arc<EventBus>) -> Self {
        Self {
            store,
            bus,
            evaluating: Mutex::new(()),
        }
    }

    /// Current roll-up without recording anything.
    pub async fn overall(
        &self,
        learner_id: DbId,
        product_id: DbId,
    ) -> Result<OverallAggregate, CoreError> {
        let modules = self.store.list_modules(product_id).await?;
        let contents = self.store.list_contents(product_id).await?;
        let records = self.store.list_progress(learner_id, product_id).await?;
        Ok(overall_progress(
            learner_id,
            product_id,
            &modules,
            &contents,
            &records,
        ))
    }

    /// Recompute and record the overall percent, firing on completion.
    ///
    /// The previous percent is read from the store on every call; nothing
    /// is cached between evaluations.
    pub async fn evaluate(
        &self,
        learner_id: DbId,
        product_id: DbId,
        now: Timestamp,
    ) -> Result<OverallAggregate, CoreError> {
        let _guard = self.evaluating.lock().await;
        let aggregate = self.overall(learner_id, product_id).await?;

        let previous = self.store.last_percent(learner_id, product_id).await?;
        let mut tracker = CompletionTracker::new();
        if let Some(previous) = previous {
            tracker.seed(learner_id, product_id, previous);
        }

        if previous != Some(aggregate.overall_percent) {
            let completed_at = (aggregate.overall_percent >= COMPLETE_PERCENT).then_some(now);
            self.store
                .record_percent(learner_id, product_id, aggregate.overall_percent, completed_at)
                .await?;
        }

        if let Some(eligibility) = tracker.on_progress_changed(&aggregate, now) {
            tracing::info!(
                learner_id,
                product_id,
                total_contents = eligibility.total_contents,
                "Course completed"
            );
            self.bus.publish(LearnerEvent::course_completed(&eligibility));
        } else {
            tracing::debug!(
                learner_id,
                product_id,
                overall_percent = aggregate.overall_percent,
                "Overall progress evaluated"
            );
        }

        Ok(aggregate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use chrono::Utc;
    use drip_core::progress::ProgressRecord;
    use drip_events::bus::EVENT_COURSE_COMPLETED;

    fn complete(store: &MemoryStore, content_ids: &[DbId]) {
        let now = Utc::now();
        store.with(|s| {
            for &content_id in content_ids {
                s.progress.insert(
                    (7, content_id),
                    ProgressRecord {
                        learner_id: 7,
                        content_id,
                        watch_time_seconds: 100,
                        last_position_seconds: 100,
                        completed_at: Some(now),
                        updated_at: now,
                    },
                );
            }
        });
    }

    #[tokio::test]
    async fn fires_once_on_transition() {
        let store = Arc::new(MemoryStore::course());
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let service = CompletionService::new(store.clone(), bus.clone());

        complete(&store, &[100, 101]);
        let half = service.evaluate(7, 1, Utc::now()).await.unwrap();
        assert_eq!(half.overall_percent, 50);

        complete(&store, &[110, 111]);
        for _ in 0..3 {
            let full = service.evaluate(7, 1, Utc::now()).await.unwrap();
            assert_eq!(full.overall_percent, 100);
        }

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, EVENT_COURSE_COMPLETED);
        assert_eq!(event.eligibility().unwrap().total_contents, 4);
        assert!(rx.try_recv().is_err(), "only one completion event");
        assert_eq!(store.with(|s| s.completions[&(7, 1)].0), 100);
    }

    #[tokio::test]
    async fn persisted_percent_survives_restart() {
        let store = Arc::new(MemoryStore::course());
        store.with(|s| s.completions.insert((7, 1), (100, Some(Utc::now()))));
        complete(&store, &[100, 101, 110, 111]);

        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let service = CompletionService::new(store, bus.clone());

        service.evaluate(7, 1, Utc::now()).await.unwrap();
        assert!(rx.try_recv().is_err(), "already completed before restart");
    }

    #[tokio::test]
    async fn first_observation_at_full_fires() {
        let store = Arc::new(MemoryStore::course());
        complete(&store, &[100, 101, 110, 111]);

        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let service = CompletionService::new(store, bus.clone());

        service.evaluate(7, 1, Utc::now()).await.unwrap();
        assert_eq!(rx.try_recv().unwrap().event_type, EVENT_COURSE_COMPLETED);
    }

    #[tokio::test]
    async fn drop_below_full_rearms_completion() {
        let store = Arc::new(MemoryStore::course());
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let service = CompletionService::new(store.clone(), bus.clone());

        complete(&store, &[100, 101, 110, 111]);
        service.evaluate(7, 1, Utc::now()).await.unwrap();
        assert!(rx.try_recv().is_ok());

        // A new content item is published to the course.
        store.with(|s| {
            s.contents.push(drip_core::progress::ContentItem {
                id: 112,
                module_id: 11,
                position: 3,
                duration_seconds: Some(60),
                is_active: true,
            })
        });
        let after = service.evaluate(7, 1, Utc::now()).await.unwrap();
        assert_eq!(after.overall_percent, 80);
        assert_eq!(after.completed_modules, 1);
        assert!(store.with(|s| s.completions[&(7, 1)].1.is_none()));

        complete(&store, &[112]);
        service.evaluate(7, 1, Utc::now()).await.unwrap();
        assert!(rx.try_recv().is_ok(), "fires again after re-completing");
    }

    #[tokio::test]
    async fn stored_percent_is_the_source_of_truth() {
        let store = Arc::new(MemoryStore::course());
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let service = CompletionService::new(store.clone(), bus.clone());

        complete(&store, &[100, 101, 110, 111]);
        service.evaluate(7, 1, Utc::now()).await.unwrap();
        assert!(rx.try_recv().is_ok());

        // Another writer lowers the stored percent behind this service's back.
        store.with(|s| s.completions.insert((7, 1), (75, None)));
        service.evaluate(7, 1, Utc::now()).await.unwrap();
        assert_eq!(rx.try_recv().unwrap().event_type, EVENT_COURSE_COMPLETED);
        assert_eq!(store.with(|s| s.completions[&(7, 1)].0), 100);
    }
}
