//! Hand-off of course completions to the certificate issuer.
//!
//! [`CertificateDispatcher`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! and forwards every `course.completed` event to the configured webhook.
//! Without a webhook URL it only logs the eligibility record.

use tokio::sync::broadcast;

use crate::bus::{LearnerEvent, EVENT_COURSE_COMPLETED};
use crate::delivery::webhook::WebhookDelivery;

pub struct CertificateDispatcher {
    webhook_url: Option<String>,
    delivery: WebhookDelivery,
}

impl CertificateDispatcher {
    pub fn new(webhook_url: Option<String>, delivery: WebhookDelivery) -> Self {
        Self {
            webhook_url,
            delivery,
        }
    }

    /// Run the dispatch loop until the bus is dropped.
    pub async fn run(self, mut receiver: broadcast::Receiver<LearnerEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) if event.event_type == EVENT_COURSE_COMPLETED => {
                    self.dispatch(&event).await;
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Certificate dispatcher lagged, some completions were not forwarded"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, certificate dispatcher shutting down");
                    break;
                }
            }
        }
    }

    async fn dispatch(&self, event: &LearnerEvent) {
        let Some(eligibility) = event.eligibility() else {
            tracing::warn!(
                learner_id = event.learner_id,
                product_id = event.product_id,
                "Completion event without eligibility payload"
            );
            return;
        };

        let Some(url) = self.webhook_url.as_deref() else {
            tracing::info!(
                learner_id = eligibility.learner_id,
                product_id = eligibility.product_id,
                completed_at = %eligibility.completed_at,
                "Course completed, no certificate webhook configured"
            );
            return;
        };

        match self.delivery.deliver(url, event).await {
            Ok(()) => tracing::info!(
                learner_id = eligibility.learner_id,
                product_id = eligibility.product_id,
                "Certificate eligibility delivered"
            ),
            Err(e) => tracing::error!(
                learner_id = eligibility.learner_id,
                product_id = eligibility.product_id,
                error = %e,
                "Certificate eligibility delivery failed"
            ),
        }
    }
}
