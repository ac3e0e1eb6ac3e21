use serde::{Deserialize, Serialize};

use std::fmt;

/// Catalog skill identifier, e.g. `"listening.main-idea"`.
///
/// Skills are external reference data; the workflow core only ever holds
/// their ids and resolves them through the catalog adapter (fail-closed).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillId(pub String);

impl SkillId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SkillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SkillId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A resolved catalog skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: SkillId,
    /// Catalog grouping ("listening", "structure", "reading", ...).
    pub category: String,
    /// Human-readable name for display.
    pub label: String,
}

/// Skills of one category, used in reconciliation output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub category: String,
    pub skills: Vec<Skill>,
}

/// The read-time comparison of requested vs. granted skill sets for a plan.
///
/// The three groupings are disjoint: honored = requested ∩ granted,
/// dropped = requested \ granted, added = granted \ requested. Groups are
/// sorted by category, then by skill id, so repeated runs yield identical
/// output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillReconciliation {
    pub honored: Vec<CategoryGroup>,
    pub dropped: Vec<CategoryGroup>,
    pub added: Vec<CategoryGroup>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skill_id_display() {
        let id = SkillId::new("listening.main-idea");
        assert_eq!(id.to_string(), "listening.main-idea");
        assert_eq!(id.as_str(), "listening.main-idea");
    }

    #[test]
    fn skill_id_serializes_transparently() {
        let id = SkillId::new("reading.inference");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"reading.inference\"");
    }
}
