//! Skill request/grant reconciliation.
//!
//! A pure read operation with no stored state: given a plan's requested
//! skill set R and its feedback's granted set G, produce three disjoint
//! groupings -- honored (R ∩ G), dropped (R \ G), added (G \ R) -- grouped
//! by catalog category. Output is order-stable (category, then skill id),
//! so presentation layers render consistently and tests can assert exact
//! ordering.

use std::collections::{BTreeMap, BTreeSet};

use prepflow_types::skill::{CategoryGroup, Skill, SkillId, SkillReconciliation};

/// Compare the requested skills against the granted skills.
///
/// Both slices carry catalog-resolved records. Granted skills need not be a
/// subset of requested ones; grants beyond the request land in `added`.
/// Running this twice on the same inputs yields identical output.
pub fn reconcile(requested: &[Skill], granted: &[Skill]) -> SkillReconciliation {
    let requested_ids: BTreeSet<&SkillId> = requested.iter().map(|s| &s.id).collect();
    let granted_ids: BTreeSet<&SkillId> = granted.iter().map(|s| &s.id).collect();

    let honored = requested
        .iter()
        .filter(|s| granted_ids.contains(&s.id))
        .cloned();
    let dropped = requested
        .iter()
        .filter(|s| !granted_ids.contains(&s.id))
        .cloned();
    let added = granted
        .iter()
        .filter(|s| !requested_ids.contains(&s.id))
        .cloned();

    SkillReconciliation {
        honored: group_by_category(honored),
        dropped: group_by_category(dropped),
        added: group_by_category(added),
    }
}

/// Group skills by category, sorted by category then skill id.
fn group_by_category(skills: impl Iterator<Item = Skill>) -> Vec<CategoryGroup> {
    let mut by_category: BTreeMap<String, BTreeMap<SkillId, Skill>> = BTreeMap::new();
    for skill in skills {
        by_category
            .entry(skill.category.clone())
            .or_default()
            .insert(skill.id.clone(), skill);
    }

    by_category
        .into_iter()
        .map(|(category, skills)| CategoryGroup {
            category,
            skills: skills.into_values().collect(),
        })
        .collect()
}
