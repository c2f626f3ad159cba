//! Drip release policies and the release resolver.
//!
//! A [`ReleasePolicy`] describes *when* one content item unlocks for a
//! learner. [`resolve_access`] evaluates a policy against the learner's
//! purchase date, the prerequisite's completion state, and an injected
//! `now`, producing an [`AccessDecision`]. Nothing here reads the clock.

use chrono::{DateTime, Days, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Release type tags as stored in `content_release_policies.release_type`.
pub const RELEASE_IMMEDIATE: &str = "immediate";
pub const RELEASE_DAYS_AFTER_PURCHASE: &str = "days_after_purchase";
pub const RELEASE_FIXED_DATE: &str = "fixed_date";
pub const RELEASE_AFTER_CONTENT: &str = "after_content";

/// All valid release type tags.
pub const VALID_RELEASE_TYPES: &[&str] = &[
    RELEASE_IMMEDIATE,
    RELEASE_DAYS_AFTER_PURCHASE,
    RELEASE_FIXED_DATE,
    RELEASE_AFTER_CONTENT,
];

/// Upper bound for a days-after-purchase delay (ten years).
pub const MAX_RELEASE_DAYS: u32 = 3650;

// ---------------------------------------------------------------------------
// Release policy
// ---------------------------------------------------------------------------

/// When a single content item becomes available.
///
/// Deserialization applies the same day-range check as [`from_columns`].
///
/// [`from_columns`]: ReleasePolicy::from_columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", try_from = "ReleasePolicyRepr")]
pub enum ReleasePolicy {
    /// Available as soon as the product is purchased.
    Immediate,
    /// Available a number of calendar days after purchase.
    DaysAfterPurchase { days: u32 },
    /// Available from an absolute instant.
    FixedDate { date: Timestamp },
    /// Available once another content item is completed.
    AfterContent { prerequisite_id: DbId },
}

/// Unchecked wire shape of [`ReleasePolicy`].
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ReleasePolicyRepr {
    Immediate,
    DaysAfterPurchase { days: i64 },
    FixedDate { date: Timestamp },
    AfterContent { prerequisite_id: DbId },
}

impl TryFrom<ReleasePolicyRepr> for ReleasePolicy {
    type Error = CoreError;

    fn try_from(repr: ReleasePolicyRepr) -> Result<Self, Self::Error> {
        Ok(match repr {
            ReleasePolicyRepr::Immediate => Self::Immediate,
            ReleasePolicyRepr::DaysAfterPurchase { days } => {
                let days = i32::try_from(days).map_err(|_| days_out_of_range(days))?;
                Self::DaysAfterPurchase {
                    days: validate_release_days(days)?,
                }
            }
            ReleasePolicyRepr::FixedDate { date } => Self::FixedDate { date },
            ReleasePolicyRepr::AfterContent { prerequisite_id } => {
                Self::AfterContent { prerequisite_id }
            }
        })
    }
}

impl ReleasePolicy {
    /// Build a policy from its nullable-column storage form.
    ///
    /// Exactly the columns belonging to `release_type` may be populated.
    pub fn from_columns(
        release_type: &str,
        days: Option<i32>,
        fixed_date: Option<Timestamp>,
        prerequisite_id: Option<DbId>,
    ) -> Result<Self, CoreError> {
        let policy = match release_type {
            RELEASE_IMMEDIATE => Self::Immediate,
            RELEASE_DAYS_AFTER_PURCHASE => {
                let days = days.ok_or_else(|| missing_field(release_type, "days"))?;
                Self::DaysAfterPurchase {
                    days: validate_release_days(days)?,
                }
            }
            RELEASE_FIXED_DATE => Self::FixedDate {
                date: fixed_date.ok_or_else(|| missing_field(release_type, "fixed_date"))?,
            },
            RELEASE_AFTER_CONTENT => Self::AfterContent {
                prerequisite_id: prerequisite_id
                    .ok_or_else(|| missing_field(release_type, "prerequisite_id"))?,
            },
            other => {
                return Err(CoreError::Validation(format!(
                    "Invalid release type '{other}'. Must be one of: {}",
                    VALID_RELEASE_TYPES.join(", ")
                )))
            }
        };

        let stray = [
            ("days", days.is_some() && policy.days().is_none()),
            ("fixed_date", fixed_date.is_some() && policy.fixed_date().is_none()),
            (
                "prerequisite_id",
                prerequisite_id.is_some() && policy.prerequisite_id().is_none(),
            ),
        ];
        if let Some((field, _)) = stray.iter().find(|(_, set)| *set) {
            return Err(CoreError::Validation(format!(
                "Field '{field}' must be null for release type '{release_type}'"
            )));
        }

        Ok(policy)
    }

    /// The storage tag for this variant.
    pub fn release_type(&self) -> &'static str {
        match self {
            Self::Immediate => RELEASE_IMMEDIATE,
            Self::DaysAfterPurchase { .. } => RELEASE_DAYS_AFTER_PURCHASE,
            Self::FixedDate { .. } => RELEASE_FIXED_DATE,
            Self::AfterContent { .. } => RELEASE_AFTER_CONTENT,
        }
    }

    pub fn days(&self) -> Option<i32> {
        match self {
            Self::DaysAfterPurchase { days } => i32::try_from(*days).ok(),
            _ => None,
        }
    }

    pub fn fixed_date(&self) -> Option<Timestamp> {
        match self {
            Self::FixedDate { date } => Some(*date),
            _ => None,
        }
    }

    pub fn prerequisite_id(&self) -> Option<DbId> {
        match self {
            Self::AfterContent { prerequisite_id } => Some(*prerequisite_id),
            _ => None,
        }
    }
}

fn missing_field(release_type: &str, field: &str) -> CoreError {
    CoreError::Validation(format!(
        "Release type '{release_type}' requires '{field}'"
    ))
}

/// Validate a days-after-purchase delay: `1..=MAX_RELEASE_DAYS`.
pub fn validate_release_days(days: i32) -> Result<u32, CoreError> {
    match u32::try_from(days) {
        Ok(valid) if (1..=MAX_RELEASE_DAYS).contains(&valid) => Ok(valid),
        _ => Err(days_out_of_range(days.into())),
    }
}

fn days_out_of_range(days: i64) -> CoreError {
    CoreError::Validation(format!(
        "Release days must be between 1 and {MAX_RELEASE_DAYS}, got {days}"
    ))
}

// ---------------------------------------------------------------------------
// Stored (unparsed) policy
// ---------------------------------------------------------------------------

/// A release policy exactly as stored, before variant validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredReleasePolicy {
    pub content_id: DbId,
    pub release_type: String,
    pub days: Option<i32>,
    pub fixed_date: Option<Timestamp>,
    pub prerequisite_id: Option<DbId>,
}

impl StoredReleasePolicy {
    pub fn parse(&self) -> Result<ReleasePolicy, CoreError> {
        ReleasePolicy::from_columns(
            &self.release_type,
            self.days,
            self.fixed_date,
            self.prerequisite_id,
        )
    }
}

// ---------------------------------------------------------------------------
// Access decision
// ---------------------------------------------------------------------------

/// Why a content item is or is not accessible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessReason {
    Available,
    DripLocked,
    GroupLocked,
    NotPurchased,
}

impl AccessReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::DripLocked => "drip_locked",
            Self::GroupLocked => "group_locked",
            Self::NotPurchased => "not_purchased",
        }
    }
}

/// Derived, non-persisted access verdict for one content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    pub content_id: DbId,
    pub is_accessible: bool,
    /// When the content unlocks (or unlocked), if that is knowable.
    pub unlock_date: Option<Timestamp>,
    pub reason: AccessReason,
}

impl AccessDecision {
    pub fn available(content_id: DbId, unlock_date: Option<Timestamp>) -> Self {
        Self {
            content_id,
            is_accessible: true,
            unlock_date,
            reason: AccessReason::Available,
        }
    }

    pub fn drip_locked(content_id: DbId, unlock_date: Option<Timestamp>) -> Self {
        Self {
            content_id,
            is_accessible: false,
            unlock_date,
            reason: AccessReason::DripLocked,
        }
    }

    pub fn group_locked(content_id: DbId) -> Self {
        Self {
            content_id,
            is_accessible: false,
            unlock_date: None,
            reason: AccessReason::GroupLocked,
        }
    }

    pub fn not_purchased(content_id: DbId) -> Self {
        Self {
            content_id,
            is_accessible: false,
            unlock_date: None,
            reason: AccessReason::NotPurchased,
        }
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Add `days` calendar days to `purchase_date` in its own time zone.
///
/// The wall-clock time is preserved across DST and month boundaries.
/// Returns `None` when the result is unrepresentable or falls in a local
/// time gap.
pub fn unlock_after_days<Tz: TimeZone>(
    purchase_date: &DateTime<Tz>,
    days: u32,
) -> Option<Timestamp> {
    purchase_date
        .clone()
        .checked_add_days(Days::new(u64::from(days)))
        .map(|d| d.with_timezone(&Utc))
}

/// Resolve a single content item's release policy.
///
/// An absent policy behaves as [`ReleasePolicy::Immediate`]. For
/// [`ReleasePolicy::AfterContent`] the caller supplies the prerequisite's
/// completion timestamp; the unlock date is never known in advance.
pub fn resolve_access<Tz: TimeZone>(
    content_id: DbId,
    policy: Option<&ReleasePolicy>,
    purchase_date: &DateTime<Tz>,
    prerequisite_completed_at: Option<Timestamp>,
    now: Timestamp,
) -> AccessDecision {
    match policy.copied().unwrap_or(ReleasePolicy::Immediate) {
        ReleasePolicy::Immediate => AccessDecision::available(content_id, None),
        ReleasePolicy::DaysAfterPurchase { days } => {
            match unlock_after_days(purchase_date, days) {
                Some(unlock) if now >= unlock => AccessDecision::available(content_id, Some(unlock)),
                Some(unlock) => AccessDecision::drip_locked(content_id, Some(unlock)),
                None => AccessDecision::drip_locked(content_id, None),
            }
        }
        ReleasePolicy::FixedDate { date } => {
            if now >= date {
                AccessDecision::available(content_id, Some(date))
            } else {
                AccessDecision::drip_locked(content_id, Some(date))
            }
        }
        ReleasePolicy::AfterContent { .. } => match prerequisite_completed_at {
            Some(completed_at) => AccessDecision::available(content_id, Some(completed_at)),
            None => AccessDecision::drip_locked(content_id, None),
        },
    }
}

/// Resolve a policy in its stored form, failing closed when it is malformed.
pub fn resolve_stored_access<Tz: TimeZone>(
    content_id: DbId,
    stored: Option<&StoredReleasePolicy>,
    purchase_date: &DateTime<Tz>,
    prerequisite_completed_at: Option<Timestamp>,
    now: Timestamp,
) -> AccessDecision {
    match stored.map(StoredReleasePolicy::parse) {
        None => resolve_access(content_id, None, purchase_date, prerequisite_completed_at, now),
        Some(Ok(policy)) => resolve_access(
            content_id,
            Some(&policy),
            purchase_date,
            prerequisite_completed_at,
            now,
        ),
        Some(Err(_)) => AccessDecision::drip_locked(content_id, None),
    }
}
