//! Content access evaluation.
//!
//! Combines the layers in order: purchase, group visibility of the owning
//! module, then the drip release policy. A module hidden by group
//! permission short-circuits; its release policies are never evaluated.

use std::collections::{HashMap, HashSet};

use crate::permissions::{visible_module_ids, ModulePermission};
use crate::prerequisites::{prerequisite_completed_at, PrerequisiteMode};
use crate::progress::{ContentItem, ModuleItem, ProgressRecord};
use crate::release::{resolve_stored_access, AccessDecision, ReleasePolicy, StoredReleasePolicy};
use crate::types::{DbId, Timestamp};

/// Everything known about the learner for an access query.
#[derive(Debug, Clone, Copy)]
pub struct LearnerContext<'a> {
    pub learner_id: DbId,
    /// `None` when the learner has not purchased the product.
    pub purchase_date: Option<Timestamp>,
    pub groups: &'a [DbId],
}

/// A product's structure and access configuration.
#[derive(Debug, Clone, Copy)]
pub struct ProductCatalog<'a> {
    pub product_id: DbId,
    pub modules: &'a [ModuleItem],
    pub contents: &'a [ContentItem],
    pub policies: &'a [StoredReleasePolicy],
    pub permissions: &'a [ModulePermission],
}

/// Decide access to a single content item.
pub fn evaluate_content_access(
    content_id: DbId,
    purchase_date: Option<Timestamp>,
    module_visible: bool,
    policy: Option<&StoredReleasePolicy>,
    prerequisite_completed_at: Option<Timestamp>,
    now: Timestamp,
) -> AccessDecision {
    let Some(purchase_date) = purchase_date else {
        return AccessDecision::not_purchased(content_id);
    };
    if !module_visible {
        return AccessDecision::group_locked(content_id);
    }
    resolve_stored_access(content_id, policy, &purchase_date, prerequisite_completed_at, now)
}

/// Decide access for every active content item of a product, in module
/// and content position order.
pub fn evaluate_product_access(
    learner: &LearnerContext<'_>,
    catalog: &ProductCatalog<'_>,
    records: &[ProgressRecord],
    mode: PrerequisiteMode,
    now: Timestamp,
) -> Vec<AccessDecision> {
    let mut modules: Vec<&ModuleItem> = catalog
        .modules
        .iter()
        .filter(|m| m.product_id == catalog.product_id)
        .collect();
    modules.sort_by_key(|m| (m.position, m.id));

    let module_ids: Vec<DbId> = modules.iter().map(|m| m.id).collect();
    let visible = visible_module_ids(learner.groups, &module_ids, catalog.permissions);

    let product_content: HashSet<DbId> = catalog
        .contents
        .iter()
        .filter(|c| module_ids.contains(&c.module_id))
        .map(|c| c.id)
        .collect();

    let stored: HashMap<DbId, &StoredReleasePolicy> = catalog
        .policies
        .iter()
        .map(|p| (p.content_id, p))
        .collect();
    let parsed: HashMap<DbId, ReleasePolicy> = catalog
        .policies
        .iter()
        .filter_map(|p| p.parse().ok().map(|policy| (p.content_id, policy)))
        .collect();

    // Completions outside this product never satisfy a prerequisite.
    let completions: HashMap<DbId, Timestamp> = records
        .iter()
        .filter(|r| r.learner_id == learner.learner_id && product_content.contains(&r.content_id))
        .filter_map(|r| r.completed_at.map(|at| (r.content_id, at)))
        .collect();

    let mut decisions = Vec::new();
    for module in modules {
        let mut contents: Vec<&ContentItem> = catalog
            .contents
            .iter()
            .filter(|c| c.module_id == module.id && c.is_active)
            .collect();
        contents.sort_by_key(|c| (c.position, c.id));

        for content in contents {
            let prerequisite = prerequisite_completed_at(content.id, &parsed, &completions, mode);
            decisions.push(evaluate_content_access(
                content.id,
                learner.purchase_date,
                visible.contains(&module.id),
                stored.get(&content.id).copied(),
                prerequisite,
                now,
            ));
        }
    }
    decisions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::AccessReason;

    fn ts(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    fn content(id: DbId, module_id: DbId, position: i32) -> ContentItem {
        ContentItem {
            id,
            module_id,
            position,
            duration_seconds: Some(300),
            is_active: true,
        }
    }

    fn policy(content_id: DbId, release_type: &str) -> StoredReleasePolicy {
        StoredReleasePolicy {
            content_id,
            release_type: release_type.to_string(),
            days: None,
            fixed_date: None,
            prerequisite_id: None,
        }
    }

    fn completed(content_id: DbId, at: &str) -> ProgressRecord {
        ProgressRecord {
            learner_id: 1,
            content_id,
            watch_time_seconds: 300,
            last_position_seconds: 300,
            completed_at: Some(ts(at)),
            updated_at: ts(at),
        }
    }

    #[test]
    fn not_purchased_wins_over_everything() {
        let d = evaluate_content_access(1, None, false, None, None, ts("2025-01-01T00:00:00Z"));
        assert_eq!(d.reason, AccessReason::NotPurchased);
    }

    #[test]
    fn hidden_module_short_circuits_drip() {
        // A malformed policy would fail closed as drip_locked; the group
        // layer must answer first.
        let broken = policy(1, "days_after_purchase");
        let d = evaluate_content_access(
            1,
            Some(ts("2025-01-01T00:00:00Z")),
            false,
            Some(&broken),
            None,
            ts("2025-02-01T00:00:00Z"),
        );
        assert_eq!(d, AccessDecision::group_locked(1));
    }

    #[test]
    fn visible_module_still_requires_drip_check() {
        let mut p = policy(1, "days_after_purchase");
        p.days = Some(30);
        let d = evaluate_content_access(
            1,
            Some(ts("2025-01-01T00:00:00Z")),
            true,
            Some(&p),
            None,
            ts("2025-01-10T00:00:00Z"),
        );
        assert_eq!(d.reason, AccessReason::DripLocked);
        assert_eq!(d.unlock_date, Some(ts("2025-01-31T00:00:00Z")));
    }

    #[test]
    fn product_access_in_position_order_with_layers() {
        let modules = [
            ModuleItem { id: 2, product_id: 10, position: 2 },
            ModuleItem { id: 1, product_id: 10, position: 1 },
        ];
        let contents = [content(12, 1, 2), content(11, 1, 1), content(21, 2, 1)];
        let mut gated = policy(12, "after_content");
        gated.prerequisite_id = Some(11);
        let policies = [gated];
        let permissions = [ModulePermission { group_id: 5, module_id: 2, has_access: false }];

        let learner = LearnerContext {
            learner_id: 1,
            purchase_date: Some(ts("2025-01-01T00:00:00Z")),
            groups: &[5],
        };
        let catalog = ProductCatalog {
            product_id: 10,
            modules: &modules,
            contents: &contents,
            policies: &policies,
            permissions: &permissions,
        };
        let now = ts("2025-03-01T00:00:00Z");

        let before = evaluate_product_access(&learner, &catalog, &[], PrerequisiteMode::SingleHop, now);
        let ids: Vec<DbId> = before.iter().map(|d| d.content_id).collect();
        assert_eq!(ids, vec![11, 12, 21]);
        assert_eq!(before[0].reason, AccessReason::Available);
        assert_eq!(before[1].reason, AccessReason::DripLocked);
        assert_eq!(before[2].reason, AccessReason::GroupLocked);

        let records = [completed(11, "2025-02-01T00:00:00Z")];
        let after = evaluate_product_access(&learner, &catalog, &records, PrerequisiteMode::SingleHop, now);
        assert!(after[1].is_accessible);
    }

    #[test]
    fn prerequisite_outside_product_fails_closed() {
        let modules = [ModuleItem { id: 1, product_id: 10, position: 1 }];
        let contents = [content(11, 1, 1)];
        let mut gated = policy(11, "after_content");
        gated.prerequisite_id = Some(999);
        let policies = [gated];

        let learner = LearnerContext {
            learner_id: 1,
            purchase_date: Some(ts("2025-01-01T00:00:00Z")),
            groups: &[],
        };
        let catalog = ProductCatalog {
            product_id: 10,
            modules: &modules,
            contents: &contents,
            policies: &policies,
            permissions: &[],
        };
        let records = [completed(999, "2025-01-02T00:00:00Z")];

        let decisions = evaluate_product_access(
            &learner,
            &catalog,
            &records,
            PrerequisiteMode::SingleHop,
            ts("2025-03-01T00:00:00Z"),
        );
        assert_eq!(decisions[0].reason, AccessReason::DripLocked);
    }
}
