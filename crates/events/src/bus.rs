//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` between the progress service,
//! the completion sweep and the certificate dispatcher.

use chrono::{DateTime, Utc};
use drip_core::completion::CertificateEligibility;
use drip_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// A content item's progress record changed.
pub const EVENT_PROGRESS_UPDATED: &str = "progress.updated";

/// A content item was explicitly marked or unmarked complete.
pub const EVENT_CONTENT_COMPLETION_CHANGED: &str = "content.completion_changed";

/// A learner's overall progress reached 100% from below.
pub const EVENT_COURSE_COMPLETED: &str = "course.completed";

// ---------------------------------------------------------------------------
// LearnerEvent
// ---------------------------------------------------------------------------

/// A learner-scoped domain event.
///
/// Constructed via [`LearnerEvent::new`] and enriched with
/// [`with_content`](LearnerEvent::with_content) and
/// [`with_payload`](LearnerEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerEvent {
    /// Dot-separated event name, e.g. `"course.completed"`.
    pub event_type: String,

    pub learner_id: DbId,

    pub product_id: DbId,

    /// Set for content-level events.
    pub content_id: Option<DbId>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl LearnerEvent {
    pub fn new(event_type: impl Into<String>, learner_id: DbId, product_id: DbId) -> Self {
        Self {
            event_type: event_type.into(),
            learner_id,
            product_id,
            content_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_content(mut self, content_id: DbId) -> Self {
        self.content_id = Some(content_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Build the `course.completed` event carrying the eligibility record.
    pub fn course_completed(eligibility: &CertificateEligibility) -> Self {
        let payload = serde_json::to_value(eligibility)
            .unwrap_or_else(|_| serde_json::Value::Object(Default::default()));
        Self::new(
            EVENT_COURSE_COMPLETED,
            eligibility.learner_id,
            eligibility.product_id,
        )
        .with_payload(payload)
    }

    /// Decode the eligibility record from a `course.completed` event.
    pub fn eligibility(&self) -> Option<CertificateEligibility> {
        if self.event_type != EVENT_COURSE_COMPLETED {
            return None;
        }
        serde_json::from_value(self.payload.clone()).ok()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use drip_events::bus::{EventBus, LearnerEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(LearnerEvent::new("progress.updated", 1, 2));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<LearnerEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest messages are dropped and slow
    /// receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Events published with no subscribers are dropped.
    pub fn publish(&self, event: LearnerEvent) {
        // SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LearnerEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn eligibility() -> CertificateEligibility {
        CertificateEligibility {
            learner_id: 7,
            product_id: 3,
            completed_at: "2025-03-01T12:00:00Z".parse().unwrap(),
            total_contents: 12,
            watch_time_seconds: 5400,
        }
    }

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let event = LearnerEvent::new(EVENT_PROGRESS_UPDATED, 7, 3)
            .with_content(42)
            .with_payload(serde_json::json!({"percent": 55}));
        bus.publish(event);

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, EVENT_PROGRESS_UPDATED);
        assert_eq!(received.learner_id, 7);
        assert_eq!(received.product_id, 3);
        assert_eq!(received.content_id, Some(42));
        assert_eq!(received.payload["percent"], 55);
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(LearnerEvent::new(EVENT_COURSE_COMPLETED, 1, 1));

        assert_eq!(rx1.recv().await.unwrap().event_type, EVENT_COURSE_COMPLETED);
        assert_eq!(rx2.recv().await.unwrap().event_type, EVENT_COURSE_COMPLETED);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(LearnerEvent::new(EVENT_PROGRESS_UPDATED, 1, 1));
    }

    #[test]
    fn course_completed_carries_eligibility() {
        let event = LearnerEvent::course_completed(&eligibility());
        assert_eq!(event.event_type, EVENT_COURSE_COMPLETED);
        assert_eq!(event.learner_id, 7);
        assert_eq!(event.eligibility(), Some(eligibility()));
    }

    #[test]
    fn eligibility_ignores_other_event_types() {
        let mut event = LearnerEvent::course_completed(&eligibility());
        event.event_type = EVENT_PROGRESS_UPDATED.to_string();
        assert!(event.eligibility().is_none());
    }
}
