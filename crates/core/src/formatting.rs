//! Display helpers for watch time and unlock countdowns.

use crate::release::{AccessDecision, AccessReason};
use crate::types::Timestamp;

/// Compact watch-time label: `"1h 05m"`, `"4m 09s"`, `"42s"`.
pub fn format_watch_time(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else if minutes > 0 {
        format!("{minutes}m {secs:02}s")
    } else {
        format!("{secs}s")
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{n} {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

/// Human countdown until `unlock`, relative to `now`.
pub fn format_unlock_countdown(unlock: Timestamp, now: Timestamp) -> String {
    let remaining = unlock - now;
    if remaining <= chrono::Duration::zero() {
        return "Available".to_string();
    }

    // Round up so "Unlocks in 0 minutes" never shows.
    let minutes = (remaining.num_seconds() + 59) / 60;
    if minutes < 60 {
        return format!("Unlocks in {}", plural(minutes, "minute"));
    }
    let hours = (minutes + 59) / 60;
    if hours < 24 {
        return format!("Unlocks in {}", plural(hours, "hour"));
    }
    let days = (hours + 23) / 24;
    format!("Unlocks in {}", plural(days, "day"))
}

impl AccessDecision {
    /// Short learner-facing status line.
    pub fn label(&self, now: Timestamp) -> String {
        match (self.reason, self.unlock_date) {
            (AccessReason::Available, _) => "Available".to_string(),
            (AccessReason::DripLocked, Some(unlock)) => format_unlock_countdown(unlock, now),
            (AccessReason::DripLocked, None) => "Locked".to_string(),
            (AccessReason::GroupLocked, _) => "Not included in your plan".to_string(),
            (AccessReason::NotPurchased, _) => "Purchase required".to_string(),
        }
    }
}
