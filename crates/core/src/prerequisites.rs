//! Prerequisite chains formed by `after_content` release policies.
//!
//! Every content item has at most one prerequisite, so the policies of a
//! product form a functional graph: following prerequisites from any item
//! either terminates or enters a cycle. Cycles are rejected on write and
//! resolve as "never completed" on read.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::release::ReleasePolicy;
use crate::types::{DbId, Timestamp};

/// How far a prerequisite check reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrerequisiteMode {
    /// Only the direct prerequisite must be completed.
    #[default]
    SingleHop,
    /// Every item up the chain must be completed.
    Transitive,
}

impl PrerequisiteMode {
    pub fn from_str_value(s: &str) -> Result<Self, CoreError> {
        match s {
            "single_hop" => Ok(Self::SingleHop),
            "transitive" => Ok(Self::Transitive),
            _ => Err(CoreError::Validation(format!(
                "Invalid prerequisite mode '{s}'. Must be one of: single_hop, transitive"
            ))),
        }
    }
}

fn direct_prerequisite(
    content_id: DbId,
    policies: &HashMap<DbId, ReleasePolicy>,
) -> Option<DbId> {
    policies.get(&content_id).and_then(ReleasePolicy::prerequisite_id)
}

/// Ordered transitive prerequisites of `content_id`, nearest first.
///
/// Returns [`CoreError::Conflict`] when the chain loops.
pub fn prerequisite_chain(
    content_id: DbId,
    policies: &HashMap<DbId, ReleasePolicy>,
) -> Result<Vec<DbId>, CoreError> {
    let mut chain = Vec::new();
    let mut seen = HashSet::from([content_id]);
    let mut current = content_id;

    while let Some(next) = direct_prerequisite(current, policies) {
        if !seen.insert(next) {
            return Err(CoreError::Conflict(format!(
                "Prerequisite cycle detected at content {next}"
            )));
        }
        chain.push(next);
        current = next;
    }
    Ok(chain)
}

/// Find any prerequisite cycle. Returns its members in chain order.
pub fn find_cycle(policies: &HashMap<DbId, ReleasePolicy>) -> Option<Vec<DbId>> {
    let mut cleared: HashSet<DbId> = HashSet::new();

    let mut starts: Vec<DbId> = policies.keys().copied().collect();
    starts.sort_unstable();

    for start in starts {
        if cleared.contains(&start) {
            continue;
        }
        let mut path: Vec<DbId> = Vec::new();
        let mut current = Some(start);

        while let Some(id) = current {
            if cleared.contains(&id) {
                break;
            }
            if let Some(pos) = path.iter().position(|p| *p == id) {
                return Some(path[pos..].to_vec());
            }
            path.push(id);
            current = direct_prerequisite(id, policies);
        }
        cleared.extend(path);
    }
    None
}

/// Validate a proposed `after_content` prerequisite before it is stored.
///
/// `product_of` maps every known content id to its product id. `policies`
/// holds the product's current policies; the proposal replaces any policy
/// already attached to `content_id`.
pub fn validate_prerequisite(
    content_id: DbId,
    prerequisite_id: DbId,
    product_of: &HashMap<DbId, DbId>,
    policies: &HashMap<DbId, ReleasePolicy>,
) -> Result<(), CoreError> {
    if content_id == prerequisite_id {
        return Err(CoreError::Validation(
            "A content item cannot be its own prerequisite".to_string(),
        ));
    }

    let product = product_of.get(&content_id).ok_or(CoreError::NotFound {
        entity: "content",
        id: content_id,
    })?;
    let prerequisite_product = product_of.get(&prerequisite_id).ok_or(CoreError::NotFound {
        entity: "content",
        id: prerequisite_id,
    })?;
    if product != prerequisite_product {
        return Err(CoreError::Validation(format!(
            "Prerequisite {prerequisite_id} belongs to a different product"
        )));
    }

    let mut proposed = policies.clone();
    proposed.insert(content_id, ReleasePolicy::AfterContent { prerequisite_id });
    prerequisite_chain(content_id, &proposed).map(|_| ())
}

/// Completion timestamp that satisfies `content_id`'s prerequisite, if any.
///
/// `completions` maps content ids to their completion timestamp for one
/// learner. A missing reference or a cycle yields `None`.
pub fn prerequisite_completed_at(
    content_id: DbId,
    policies: &HashMap<DbId, ReleasePolicy>,
    completions: &HashMap<DbId, Timestamp>,
    mode: PrerequisiteMode,
) -> Option<Timestamp> {
    match mode {
        PrerequisiteMode::SingleHop => {
            let prerequisite = direct_prerequisite(content_id, policies)?;
            completions.get(&prerequisite).copied()
        }
        PrerequisiteMode::Transitive => {
            let chain = prerequisite_chain(content_id, policies).ok()?;
            if chain.is_empty() {
                return None;
            }
            chain
                .iter()
                .map(|id| completions.get(id).copied())
                .collect::<Option<Vec<_>>>()?
                .into_iter()
                .max()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn after(prerequisite_id: DbId) -> ReleasePolicy {
        ReleasePolicy::AfterContent { prerequisite_id }
    }

    fn ts(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    fn same_product(ids: &[DbId]) -> HashMap<DbId, DbId> {
        ids.iter().map(|id| (*id, 100)).collect()
    }

    #[test]
    fn chain_follows_prerequisites_in_order() {
        let policies = HashMap::from([(3, after(2)), (2, after(1)), (1, ReleasePolicy::Immediate)]);
        assert_eq!(prerequisite_chain(3, &policies).unwrap(), vec![2, 1]);
        assert!(prerequisite_chain(1, &policies).unwrap().is_empty());
    }

    #[test]
    fn chain_reports_cycle() {
        let policies = HashMap::from([(1, after(2)), (2, after(1))]);
        assert_matches!(prerequisite_chain(1, &policies), Err(CoreError::Conflict(_)));
    }

    #[test]
    fn find_cycle_returns_members() {
        let policies = HashMap::from([(1, after(2)), (2, after(3)), (3, after(2)), (4, after(1))]);
        let mut cycle = find_cycle(&policies).unwrap();
        cycle.sort_unstable();
        assert_eq!(cycle, vec![2, 3]);
    }

    #[test]
    fn find_cycle_none_for_chains() {
        let policies = HashMap::from([(1, after(2)), (2, after(3)), (4, after(3))]);
        assert!(find_cycle(&policies).is_none());
    }

    #[test]
    fn validate_rejects_self_reference() {
        let product_of = same_product(&[1]);
        assert_matches!(
            validate_prerequisite(1, 1, &product_of, &HashMap::new()),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn validate_rejects_cross_product() {
        let product_of = HashMap::from([(1, 100), (2, 200)]);
        assert_matches!(
            validate_prerequisite(1, 2, &product_of, &HashMap::new()),
            Err(CoreError::Validation(msg)) if msg.contains("different product")
        );
    }

    #[test]
    fn validate_rejects_unknown_prerequisite() {
        let product_of = same_product(&[1]);
        assert_matches!(
            validate_prerequisite(1, 99, &product_of, &HashMap::new()),
            Err(CoreError::NotFound { id: 99, .. })
        );
    }

    #[test]
    fn validate_rejects_closing_a_cycle() {
        let product_of = same_product(&[1, 2, 3]);
        let policies = HashMap::from([(2, after(1)), (3, after(2))]);
        assert_matches!(
            validate_prerequisite(1, 3, &product_of, &policies),
            Err(CoreError::Conflict(_))
        );
        assert!(validate_prerequisite(1, 2, &product_of, &HashMap::new()).is_ok());
    }

    #[test]
    fn single_hop_checks_direct_prerequisite_only() {
        let policies = HashMap::from([(3, after(2)), (2, after(1))]);
        let done = ts("2025-02-01T00:00:00Z");
        let completions = HashMap::from([(2, done)]);
        assert_eq!(
            prerequisite_completed_at(3, &policies, &completions, PrerequisiteMode::SingleHop),
            Some(done)
        );
        assert_eq!(
            prerequisite_completed_at(3, &policies, &completions, PrerequisiteMode::Transitive),
            None
        );
    }

    #[test]
    fn transitive_returns_latest_completion() {
        let policies = HashMap::from([(3, after(2)), (2, after(1))]);
        let completions = HashMap::from([
            (1, ts("2025-03-01T00:00:00Z")),
            (2, ts("2025-02-01T00:00:00Z")),
        ]);
        assert_eq!(
            prerequisite_completed_at(3, &policies, &completions, PrerequisiteMode::Transitive),
            Some(ts("2025-03-01T00:00:00Z"))
        );
    }

    #[test]
    fn cycle_and_missing_reference_fail_closed() {
        let policies = HashMap::from([(1, after(2)), (2, after(1)), (5, after(42))]);
        let completions = HashMap::from([
            (1, ts("2025-01-01T00:00:00Z")),
            (2, ts("2025-01-01T00:00:00Z")),
        ]);
        assert_eq!(
            prerequisite_completed_at(1, &policies, &completions, PrerequisiteMode::Transitive),
            None
        );
        assert_eq!(
            prerequisite_completed_at(5, &policies, &completions, PrerequisiteMode::SingleHop),
            None
        );
    }

    #[test]
    fn mode_parses_from_config_value() {
        assert_eq!(PrerequisiteMode::from_str_value("transitive").unwrap(), PrerequisiteMode::Transitive);
        assert!(PrerequisiteMode::from_str_value("deep").is_err());
    }
}
