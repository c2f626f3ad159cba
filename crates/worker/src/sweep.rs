//! Periodic completion sweep.
//!
//! Progress can be written by paths that never go through
//! [`ProgressService`](crate::services::ProgressService) (bulk imports,
//! admin tooling). The sweep re-evaluates every (learner, product) pair
//! with progress written since the previous pass so no completion is
//! missed. Percents are persisted, so re-sweeping a pair is harmless.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use drip_core::error::CoreError;
use drip_core::store::{CatalogStore, CompletionStore, ProgressStore};
use drip_core::types::Timestamp;
use tokio_util::sync::CancellationToken;

use crate::services::CompletionService;

/// Re-evaluate every pair active after `since`. Returns how many pairs
/// were evaluated.
///
/// A failing pair is logged and skipped; only a failure to list the
/// active pairs aborts the pass.
pub async fn sweep_once<S>(
    store: &S,
    completion: &CompletionService<S>,
    since: Timestamp,
    now: Timestamp,
) -> Result<usize, CoreError>
where
    S: CatalogStore + ProgressStore + CompletionStore,
{
    let pairs = store.list_active_since(since).await?;
    let mut evaluated = 0usize;

    for (learner_id, product_id) in pairs {
        match completion.evaluate(learner_id, product_id, now).await {
            Ok(_) => evaluated += 1,
            Err(e) => {
                tracing::error!(learner_id, product_id, error = %e, "Completion sweep: evaluation failed");
            }
        }
    }
    Ok(evaluated)
}

/// Run the sweep loop until `cancel` is triggered.
///
/// The first pass covers all recorded progress.
pub async fn run<S>(
    store: Arc<S>,
    completion: Arc<CompletionService<S>>,
    interval: Duration,
    cancel: CancellationToken,
) where
    S: CatalogStore + ProgressStore + CompletionStore,
{
    tracing::info!(interval_secs = interval.as_secs(), "Completion sweep started");

    let mut ticker = tokio::time::interval(interval);
    let mut since: Timestamp = DateTime::<Utc>::UNIX_EPOCH;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Completion sweep stopping");
                break;
            }
            _ = ticker.tick() => {
                let started = Utc::now();
                match sweep_once(store.as_ref(), &completion, since, started).await {
                    Ok(evaluated) => {
                        if evaluated > 0 {
                            tracing::info!(evaluated, "Completion sweep: pairs evaluated");
                        } else {
                            tracing::debug!("Completion sweep: no recent activity");
                        }
                        since = started;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Completion sweep: listing activity failed");
                    }
                }
            }
        }
    }
}
