//! Evidence requirements declared by a requirement plan.

use crate::evidence::{Evidence, Labels};
use serde::{Deserialize, Serialize};

/// True when every pair of `subset` is present with an equal value in `superset`.
pub fn check_subset(subset: &Labels, superset: &Labels) -> bool {
    subset
        .iter()
        .all(|(key, value)| superset.get(key) == Some(value))
}

/// What evidence a policy expects, and for which artifacts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRequirement {
    #[serde(default)]
    tags: Labels,
    #[serde(default)]
    label: Labels,
}

impl EvidenceRequirement {
    pub fn new(tags: Labels, label: Labels) -> Self {
        Self { tags, label }
    }

    pub fn tags(&self) -> &Labels {
        &self.tags
    }

    pub fn label(&self) -> &Labels {
        &self.label
    }

    /// Whether this requirement applies to an artifact carrying `tags`.
    /// Requirements without tags apply everywhere.
    pub fn applies_to(&self, tags: &Labels) -> bool {
        check_subset(&self.tags, tags)
    }

    pub fn is_satisfied_by(&self, evidence: &Evidence) -> bool {
        check_subset(&self.label, &evidence.label())
    }
}
