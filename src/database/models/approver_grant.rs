use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::UnknownValue;
use crate::authz::AuthScope;
use crate::types::{LevelId, RequirementId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "Pending",
            ApprovalStatus::Approved => "Approved",
            ApprovalStatus::Rejected => "Rejected",
        }
    }
}

impl TryFrom<String> for ApprovalStatus {
    type Error = UnknownValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "Pending" => Ok(ApprovalStatus::Pending),
            "Approved" => Ok(ApprovalStatus::Approved),
            "Rejected" => Ok(ApprovalStatus::Rejected),
            _ => Err(UnknownValue { kind: "approval status", value }),
        }
    }
}

/// Row of `requirements_approvers`
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApproverGrant {
    pub corporate_account: String,
    pub project_id: String,
    pub req_id: RequirementId,
    pub level_id: LevelId,
    pub approval_user_id: String,
    #[sqlx(try_from = "String")]
    pub approval_status: ApprovalStatus,
    pub approver_comments: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApproverGrant {
    pub fn target(&self) -> AuthScope {
        AuthScope::from_columns(self.req_id, self.level_id)
    }
}

/// A decision an approver submits against a target
#[derive(Debug, Clone)]
pub struct ApprovalDecision {
    pub target: AuthScope,
    pub approval_user_id: String,
    pub approval_status: ApprovalStatus,
    pub approver_comments: Option<String>,
}

/// Row of `approval_decisions`, one per approver and target
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DecisionRecord {
    pub corporate_account: String,
    pub project_id: String,
    pub req_id: RequirementId,
    pub level_id: LevelId,
    pub approval_user_id: String,
    #[sqlx(try_from = "String")]
    pub approval_status: ApprovalStatus,
    pub approver_comments: Option<String>,
    pub decided_at: DateTime<Utc>,
}

impl DecisionRecord {
    pub fn target(&self) -> AuthScope {
        AuthScope::from_columns(self.req_id, self.level_id)
    }
}
