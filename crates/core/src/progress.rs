//! Learner progress computation and roll-up.
//!
//! Content-level percentages, the completion threshold, merging of
//! reported progress ticks into stored records, and the module / product
//! aggregates used by dashboards and certificate eligibility. Every
//! function here operates on pre-loaded data passed in by the caller.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Content percent at or above which an item counts as complete.
///
/// Players rarely report the final seconds, so this is not 100.
pub const DEFAULT_COMPLETION_THRESHOLD: u8 = 90;

// ---------------------------------------------------------------------------
// Input shapes
// ---------------------------------------------------------------------------

/// A module of a product, as far as the engine needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleItem {
    pub id: DbId,
    pub product_id: DbId,
    pub position: i32,
}

/// A content item of a module, as far as the engine needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: DbId,
    pub module_id: DbId,
    pub position: i32,
    pub duration_seconds: Option<i32>,
    pub is_active: bool,
}

/// One learner's progress on one content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub learner_id: DbId,
    pub content_id: DbId,
    pub watch_time_seconds: i64,
    pub last_position_seconds: i64,
    pub completed_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

impl ProgressRecord {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// A progress report from a player or reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressTick {
    pub learner_id: DbId,
    pub content_id: DbId,
    pub watch_time_seconds: i64,
    pub last_position_seconds: i64,
}

// ---------------------------------------------------------------------------
// Output shapes
// ---------------------------------------------------------------------------

/// Roll-up of one module for one learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleAggregate {
    pub module_id: DbId,
    pub total_contents: usize,
    pub completed_contents: usize,
    pub progress_percent: u8,
    pub watch_time_seconds: i64,
    pub last_content_id: Option<DbId>,
    pub last_activity_at: Option<Timestamp>,
}

impl ModuleAggregate {
    /// All existing contents are complete. An empty module never is.
    pub fn is_completed(&self) -> bool {
        self.total_contents > 0 && self.completed_contents == self.total_contents
    }
}

/// Roll-up of a whole product for one learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverallAggregate {
    pub learner_id: DbId,
    pub product_id: DbId,
    pub total_modules: usize,
    pub completed_modules: usize,
    pub total_contents: usize,
    pub completed_contents: usize,
    pub overall_percent: u8,
    pub watch_time_seconds: i64,
    /// Most recently touched content, for "continue where you left off".
    pub last_content_id: Option<DbId>,
    pub last_activity_at: Option<Timestamp>,
    pub modules: Vec<ModuleAggregate>,
}

// ---------------------------------------------------------------------------
// Content-level
// ---------------------------------------------------------------------------

/// Percentage of a content item consumed, `0..=100`.
///
/// A missing or non-positive duration yields 0. Watched time beyond the
/// duration is clamped to 100.
pub fn content_progress_percent(watched_seconds: i64, total_duration_seconds: Option<i64>) -> u8 {
    let duration = match total_duration_seconds {
        Some(d) if d > 0 => d,
        _ => return 0,
    };
    let watched = watched_seconds.max(0);
    let pct = (watched as f64 / duration as f64 * 100.0).round();
    pct.min(100.0) as u8
}

/// Whether `percent` meets the completion `threshold`.
pub fn is_complete(percent: u8, threshold: u8) -> bool {
    percent >= threshold
}

/// Percentage of `completed` out of `total`, 0 when `total` is 0.
///
/// Only a fully completed set reports 100; anything short of it caps at 99.
pub fn ratio_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (completed as f64 / total as f64 * 100.0).round() as u8;
    if completed < total {
        pct.min(99)
    } else {
        100
    }
}

/// Apply a progress tick to the stored record (if any).
///
/// Watch time never regresses (max-wins between concurrent sessions);
/// the playback position follows the latest report. `completed_at` is set
/// once when the content crosses `threshold` and is never cleared here.
pub fn merge_progress_tick(
    existing: Option<&ProgressRecord>,
    tick: &ProgressTick,
    duration_seconds: Option<i32>,
    threshold: u8,
    now: Timestamp,
) -> ProgressRecord {
    let watch_time_seconds = existing
        .map(|r| r.watch_time_seconds)
        .unwrap_or(0)
        .max(tick.watch_time_seconds.max(0));

    let percent = content_progress_percent(watch_time_seconds, duration_seconds.map(i64::from));
    let completed_at = existing
        .and_then(|r| r.completed_at)
        .or_else(|| is_complete(percent, threshold).then_some(now));

    ProgressRecord {
        learner_id: tick.learner_id,
        content_id: tick.content_id,
        watch_time_seconds,
        last_position_seconds: tick.last_position_seconds.max(0),
        completed_at,
        updated_at: now,
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Index one learner's records by content id.
fn index_records(
    learner_id: DbId,
    records: &[ProgressRecord],
) -> HashMap<DbId, &ProgressRecord> {
    records
        .iter()
        .filter(|r| r.learner_id == learner_id)
        .map(|r| (r.content_id, r))
        .collect()
}

/// Latest record wins; on equal timestamps the later one in iteration order.
fn track_latest<'a>(latest: &mut Option<&'a ProgressRecord>, record: &'a ProgressRecord) {
    if latest.map_or(true, |current| record.updated_at >= current.updated_at) {
        *latest = Some(record);
    }
}

fn module_rollup(
    module_id: DbId,
    contents: &[ContentItem],
    records: &HashMap<DbId, &ProgressRecord>,
) -> ModuleAggregate {
    let mut module_contents: Vec<&ContentItem> = contents
        .iter()
        .filter(|c| c.module_id == module_id && c.is_active)
        .collect();
    module_contents.sort_by_key(|c| (c.position, c.id));

    let mut completed = 0usize;
    let mut watch_time = 0i64;
    let mut latest: Option<&ProgressRecord> = None;

    for content in &module_contents {
        let Some(record) = records.get(&content.id) else {
            continue;
        };
        watch_time += record.watch_time_seconds;
        if record.is_completed() {
            completed += 1;
        }
        track_latest(&mut latest, record);
    }

    ModuleAggregate {
        module_id,
        total_contents: module_contents.len(),
        completed_contents: completed,
        progress_percent: ratio_percent(completed, module_contents.len()),
        watch_time_seconds: watch_time,
        last_content_id: latest.map(|r| r.content_id),
        last_activity_at: latest.map(|r| r.updated_at),
    }
}

/// Roll up one learner's progress for a single module.
///
/// Contents outside the module and deactivated contents are ignored; a
/// content without a record counts as untouched.
pub fn module_progress(
    learner_id: DbId,
    module: &ModuleItem,
    contents: &[ContentItem],
    records: &[ProgressRecord],
) -> ModuleAggregate {
    module_rollup(module.id, contents, &index_records(learner_id, records))
}

/// Roll up one learner's progress across every module of a product.
pub fn overall_progress(
    learner_id: DbId,
    product_id: DbId,
    modules: &[ModuleItem],
    contents: &[ContentItem],
    records: &[ProgressRecord],
) -> OverallAggregate {
    let indexed = index_records(learner_id, records);

    let mut product_modules: Vec<&ModuleItem> =
        modules.iter().filter(|m| m.product_id == product_id).collect();
    product_modules.sort_by_key(|m| (m.position, m.id));

    let module_aggregates: Vec<ModuleAggregate> = product_modules
        .iter()
        .map(|m| module_rollup(m.id, contents, &indexed))
        .collect();

    let total_contents: usize = module_aggregates.iter().map(|m| m.total_contents).sum();
    let completed_contents: usize = module_aggregates.iter().map(|m| m.completed_contents).sum();
    let watch_time_seconds: i64 = module_aggregates.iter().map(|m| m.watch_time_seconds).sum();
    let completed_modules = module_aggregates.iter().filter(|m| m.is_completed()).count();

    let mut latest: Option<&ProgressRecord> = None;
    for aggregate in &module_aggregates {
        if let Some(record) = aggregate.last_content_id.and_then(|id| indexed.get(&id).copied()) {
            track_latest(&mut latest, record);
        }
    }

    OverallAggregate {
        learner_id,
        product_id,
        total_modules: module_aggregates.len(),
        completed_modules,
        total_contents,
        completed_contents,
        overall_percent: ratio_percent(completed_contents, total_contents),
        watch_time_seconds,
        last_content_id: latest.map(|r| r.content_id),
        last_activity_at: latest.map(|r| r.updated_at),
        modules: module_aggregates,
    }
}
