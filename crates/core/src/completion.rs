//! Course completion trigger.
//!
//! Certificate eligibility fires on the *transition* of a learner's overall
//! percent to 100, never on every later update that is still at 100.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::progress::OverallAggregate;
use crate::types::{DbId, Timestamp};

/// Overall percent at which a product counts as finished.
pub const COMPLETE_PERCENT: u8 = 100;

/// Hand-off payload for the certificate issuance service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateEligibility {
    pub learner_id: DbId,
    pub product_id: DbId,
    pub completed_at: Timestamp,
    pub total_contents: usize,
    pub watch_time_seconds: i64,
}

/// Compare a previous overall percent with a new aggregate.
///
/// A learner never observed before counts as 0%. Eligibility also requires
/// every counted content item to be complete, whatever the percent says.
pub fn completion_transition(
    previous_percent: Option<u8>,
    current: &OverallAggregate,
    now: Timestamp,
) -> Option<CertificateEligibility> {
    let previous = previous_percent.unwrap_or(0);
    if previous >= COMPLETE_PERCENT || current.overall_percent < COMPLETE_PERCENT {
        return None;
    }
    if current.total_contents == 0 || current.completed_contents < current.total_contents {
        return None;
    }
    Some(CertificateEligibility {
        learner_id: current.learner_id,
        product_id: current.product_id,
        completed_at: now,
        total_contents: current.total_contents,
        watch_time_seconds: current.watch_time_seconds,
    })
}

/// Remembers the last overall percent per (learner, product).
#[derive(Debug, Default)]
pub struct CompletionTracker {
    last_percent: HashMap<(DbId, DbId), u8>,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a previously persisted percent.
    pub fn seed(&mut self, learner_id: DbId, product_id: DbId, percent: u8) {
        self.last_percent.insert((learner_id, product_id), percent);
    }

    pub fn last_percent(&self, learner_id: DbId, product_id: DbId) -> Option<u8> {
        self.last_percent.get(&(learner_id, product_id)).copied()
    }

    /// Record a new aggregate, returning eligibility on the 100% transition.
    pub fn on_progress_changed(
        &mut self,
        aggregate: &OverallAggregate,
        now: Timestamp,
    ) -> Option<CertificateEligibility> {
        let key = (aggregate.learner_id, aggregate.product_id);
        let previous = self.last_percent.insert(key, aggregate.overall_percent);
        completion_transition(previous, aggregate, now)
    }
}
