//! Group-based module visibility.
//!
//! Coarse access layer, independent of drip timing. A group without an
//! explicit permission row for a module grants access; only an explicit
//! `has_access = false` row revokes it for that group. A learner in no
//! group sees a module only when no group permission rows exist for it.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// A permission row linking a group to a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulePermission {
    pub group_id: DbId,
    pub module_id: DbId,
    pub has_access: bool,
}

/// Whether a learner in `learner_groups` can see the module whose
/// permission rows are `module_permissions`.
///
/// Effective visibility is the union over the learner's groups.
pub fn is_module_visible(learner_groups: &[DbId], module_permissions: &[ModulePermission]) -> bool {
    if learner_groups.is_empty() {
        return module_permissions.is_empty();
    }

    let explicit: HashMap<DbId, bool> = module_permissions
        .iter()
        .map(|p| (p.group_id, p.has_access))
        .collect();

    learner_groups
        .iter()
        .any(|g| explicit.get(g).copied().unwrap_or(true))
}

/// Ids of the modules in `module_ids` that the learner can see.
///
/// `permissions` may span many modules; each module is judged on its own rows.
pub fn visible_module_ids(
    learner_groups: &[DbId],
    module_ids: &[DbId],
    permissions: &[ModulePermission],
) -> HashSet<DbId> {
    module_ids
        .iter()
        .copied()
        .filter(|module_id| {
            let rows: Vec<ModulePermission> = permissions
                .iter()
                .filter(|p| p.module_id == *module_id)
                .copied()
                .collect();
            is_module_visible(learner_groups, &rows)
        })
        .collect()
}
