use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::AuthzError;
use crate::types::{LevelId, RequirementId};

/// What an approval decision (or an approver grant) applies to.
///
/// Grants rows store this as a `(req_id, level_id)` column pair where zero
/// means "unset"; the enum makes the "both set" state unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum AuthScope {
    Project,
    Level(LevelId),
    Requirement(RequirementId),
}

impl AuthScope {
    /// Build a scope from optional request ids. `None` and `Some(0)` both mean
    /// "not provided"; supplying both ids is rejected.
    pub fn from_ids(req_id: Option<RequirementId>, level_id: Option<LevelId>) -> Result<Self, AuthzError> {
        let req_id = req_id.filter(|id| *id != 0);
        let level_id = level_id.filter(|id| *id != 0);

        match (req_id, level_id) {
            (None, None) => Ok(AuthScope::Project),
            (Some(req), None) => Ok(AuthScope::Requirement(req)),
            (None, Some(level)) => Ok(AuthScope::Level(level)),
            (Some(req), Some(level)) => Err(AuthzError::AmbiguousScope { req_id: req, level_id: level }),
        }
    }

    /// Column values for the `requirements_approvers` table
    pub fn to_columns(self) -> (RequirementId, LevelId) {
        match self {
            AuthScope::Project => (0, 0),
            AuthScope::Level(level) => (0, level),
            AuthScope::Requirement(req) => (req, 0),
        }
    }

    /// Inverse of [`AuthScope::to_columns`]. Rows violating the one-of
    /// constraint are read as requirement scoped.
    pub fn from_columns(req_id: RequirementId, level_id: LevelId) -> Self {
        if req_id != 0 {
            AuthScope::Requirement(req_id)
        } else if level_id != 0 {
            AuthScope::Level(level_id)
        } else {
            AuthScope::Project
        }
    }
}

impl fmt::Display for AuthScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthScope::Project => write!(f, "project"),
            AuthScope::Level(id) => write!(f, "level {}", id),
            AuthScope::Requirement(id) => write!(f, "requirement {}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_ids_mean_not_provided() {
        assert_eq!(AuthScope::from_ids(Some(0), Some(0)).unwrap(), AuthScope::Project);
        assert_eq!(AuthScope::from_ids(None, Some(0)).unwrap(), AuthScope::Project);
        assert_eq!(AuthScope::from_ids(Some(0), None).unwrap(), AuthScope::Project);
        assert_eq!(AuthScope::from_ids(Some(5), Some(0)).unwrap(), AuthScope::Requirement(5));
        assert_eq!(AuthScope::from_ids(Some(0), Some(10)).unwrap(), AuthScope::Level(10));
    }

    #[test]
    fn both_ids_are_rejected() {
        let err = AuthScope::from_ids(Some(5), Some(10)).unwrap_err();
        assert!(matches!(err, AuthzError::AmbiguousScope { req_id: 5, level_id: 10 }));
    }

    #[test]
    fn column_mapping_matches_grant_table_layout() {
        assert_eq!(AuthScope::Project.to_columns(), (0, 0));
        assert_eq!(AuthScope::Level(10).to_columns(), (0, 10));
        assert_eq!(AuthScope::Requirement(5).to_columns(), (5, 0));
        assert_eq!(AuthScope::from_columns(0, 10), AuthScope::Level(10));
        assert_eq!(AuthScope::from_columns(0, 0), AuthScope::Project);
    }

    #[test]
    fn serializes_as_tagged_value() {
        let v = serde_json::to_value(AuthScope::Level(20)).unwrap();
        assert_eq!(v, serde_json::json!({"scope": "level", "id": 20}));
        let p = serde_json::to_value(AuthScope::Project).unwrap();
        assert_eq!(p, serde_json::json!({"scope": "project"}));
    }
}
