//! Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;

/// Functional level identifier, unique within a project scope
pub type LevelId = i64;

/// Requirement or integration requirement identifier
pub type RequirementId = i64;

/// Parent pointer value marking a level with no parent
pub const ROOT_PARENT: LevelId = 0;

/// A project inside a corporate account; every hierarchy, grant and
/// requirement lives in exactly one of these
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectScope {
    pub corporate_account: String,
    pub project_id: String,
}

impl ProjectScope {
    pub fn new(corporate_account: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            corporate_account: corporate_account.into(),
            project_id: project_id.into(),
        }
    }
}

impl fmt::Display for ProjectScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.corporate_account, self.project_id)
    }
}
