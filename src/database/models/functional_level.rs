use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::UnknownValue;
use crate::types::{LevelId, ROOT_PARENT};

/// Description given to the level auto-created for a new project scope
pub const ROOT_LEVEL_DESCRIPTION: &str = "Root Level";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelStatus {
    Active,
    Inactive,
}

impl LevelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LevelStatus::Active => "Active",
            LevelStatus::Inactive => "Inactive",
        }
    }
}

impl TryFrom<String> for LevelStatus {
    type Error = UnknownValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "Active" => Ok(LevelStatus::Active),
            "Inactive" => Ok(LevelStatus::Inactive),
            _ => Err(UnknownValue { kind: "level status", value }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FunctionalLevel {
    pub corporate_account: String,
    pub project_id: String,
    pub level_id: LevelId,
    pub parent_level_id: LevelId,
    pub level_description: String,
    #[sqlx(try_from = "String")]
    pub status: LevelStatus,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FunctionalLevel {
    pub fn is_root(&self) -> bool {
        self.parent_level_id == ROOT_PARENT
    }
}

/// Insert payload; the store allocates `level_id`
#[derive(Debug, Clone)]
pub struct NewLevel {
    pub parent_level_id: LevelId,
    pub level_description: String,
    pub created_by: Option<String>,
}

/// Partial update; `None` leaves the column untouched
#[derive(Debug, Clone, Default)]
pub struct LevelChanges {
    pub level_description: Option<String>,
    pub status: Option<LevelStatus>,
}

impl LevelChanges {
    pub fn is_empty(&self) -> bool {
        self.level_description.is_none() && self.status.is_none()
    }
}

/// Outcome of a guarded parent change
#[derive(Debug, Clone)]
pub enum Reparent {
    Moved(FunctionalLevel),
    LevelMissing,
    /// The new parent's ancestor chain contains the level being moved
    WouldCreateCycle,
}

/// Rows that reference a level and block its deletion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDependents {
    pub child_levels: i64,
    pub requirements: i64,
    pub integration_requirements: i64,
    pub approver_grants: i64,
}

impl LevelDependents {
    pub fn is_empty(&self) -> bool {
        self.child_levels == 0
            && self.requirements == 0
            && self.integration_requirements == 0
            && self.approver_grants == 0
    }
}
