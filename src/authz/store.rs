use async_trait::async_trait;

use super::access::{AccessLevel, PermissionVector};
use super::scope::AuthScope;
use crate::database::manager::DatabaseError;
use crate::database::models::{
    AccessLevelDefinition, ApiAccessCategory, ApprovalDecision, ApproverGrant, DecisionRecord, FunctionalLevel,
    LevelChanges, LevelDependents, NewLevel, Reparent,
};
use crate::types::{LevelId, ProjectScope, RequirementId};

/// Functional level tree plus the requirement tables that hang off it
#[async_trait]
pub trait LevelStore: Send + Sync {
    /// Parent pointer of a level; `None` when the level has no row
    async fn parent_of(&self, scope: &ProjectScope, level_id: LevelId) -> Result<Option<LevelId>, DatabaseError>;

    async fn get_level(&self, scope: &ProjectScope, level_id: LevelId) -> Result<Option<FunctionalLevel>, DatabaseError>;

    async fn list_levels(&self, scope: &ProjectScope) -> Result<Vec<FunctionalLevel>, DatabaseError>;

    async fn insert_level(&self, scope: &ProjectScope, level: NewLevel) -> Result<FunctionalLevel, DatabaseError>;

    async fn update_level(
        &self,
        scope: &ProjectScope,
        level_id: LevelId,
        changes: LevelChanges,
    ) -> Result<Option<FunctionalLevel>, DatabaseError>;

    /// Set a level's parent in one atomic step. Refused when the new parent's
    /// ancestor chain, followed for at most `max_depth` hops, contains the level.
    async fn reparent_level(
        &self,
        scope: &ProjectScope,
        level_id: LevelId,
        new_parent_level_id: LevelId,
        max_depth: usize,
    ) -> Result<Reparent, DatabaseError>;

    async fn level_dependents(&self, scope: &ProjectScope, level_id: LevelId) -> Result<LevelDependents, DatabaseError>;

    async fn delete_level(&self, scope: &ProjectScope, level_id: LevelId) -> Result<bool, DatabaseError>;

    /// Level a row of `requirements` is filed under
    async fn requirement_level(
        &self,
        scope: &ProjectScope,
        req_id: RequirementId,
    ) -> Result<Option<LevelId>, DatabaseError>;

    /// Level a row of `integration_requirements` is filed under
    async fn integration_requirement_level(
        &self,
        scope: &ProjectScope,
        req_id: RequirementId,
    ) -> Result<Option<LevelId>, DatabaseError>;
}

/// Approver grants (`requirements_approvers`) and recorded decisions
#[async_trait]
pub trait GrantStore: Send + Sync {
    async fn has_project_grant(&self, scope: &ProjectScope, user_id: &str) -> Result<bool, DatabaseError>;

    async fn has_requirement_grant(
        &self,
        scope: &ProjectScope,
        user_id: &str,
        req_id: RequirementId,
    ) -> Result<bool, DatabaseError>;

    /// True when the user holds a level grant on any of `level_ids`
    async fn has_level_grant(
        &self,
        scope: &ProjectScope,
        user_id: &str,
        level_ids: &[LevelId],
    ) -> Result<bool, DatabaseError>;

    async fn list_grants(
        &self,
        scope: &ProjectScope,
        user_id: Option<&str>,
    ) -> Result<Vec<ApproverGrant>, DatabaseError>;

    /// Insert a pending grant; `None` when an identical grant already exists
    async fn insert_grant(
        &self,
        scope: &ProjectScope,
        user_id: &str,
        target: AuthScope,
    ) -> Result<Option<ApproverGrant>, DatabaseError>;

    /// Upsert the approver's decision at the decision's target. Grants are
    /// left untouched.
    async fn record_decision(
        &self,
        scope: &ProjectScope,
        decision: &ApprovalDecision,
    ) -> Result<DecisionRecord, DatabaseError>;

    async fn list_decisions(&self, scope: &ProjectScope, target: AuthScope) -> Result<Vec<DecisionRecord>, DatabaseError>;

    async fn delete_grant(&self, scope: &ProjectScope, user_id: &str, target: AuthScope) -> Result<bool, DatabaseError>;
}

/// User access levels and the per-account permission matrix
#[async_trait]
pub trait AccessMatrixStore: Send + Sync {
    async fn account_access_level(&self, account: &str, user_id: &str) -> Result<Option<i16>, DatabaseError>;

    async fn project_access_level(
        &self,
        account: &str,
        user_id: &str,
        project_id: &str,
    ) -> Result<Option<i16>, DatabaseError>;

    async fn set_account_access_level(
        &self,
        account: &str,
        user_id: &str,
        level: AccessLevel,
    ) -> Result<(), DatabaseError>;

    async fn set_project_access_level(
        &self,
        account: &str,
        user_id: &str,
        project_id: &str,
        level: AccessLevel,
    ) -> Result<(), DatabaseError>;

    async fn api_category(&self, api_name: &str) -> Result<Option<ApiAccessCategory>, DatabaseError>;

    async fn list_api_categories(&self) -> Result<Vec<ApiAccessCategory>, DatabaseError>;

    async fn definition(
        &self,
        account: &str,
        category_header: &str,
        category_sub_header: &str,
    ) -> Result<Option<AccessLevelDefinition>, DatabaseError>;

    async fn list_definitions(&self, account: &str) -> Result<Vec<AccessLevelDefinition>, DatabaseError>;

    async fn upsert_definition(
        &self,
        account: &str,
        category_header: &str,
        category_sub_header: &str,
        level_grants: PermissionVector,
    ) -> Result<AccessLevelDefinition, DatabaseError>;

    /// Flip one level's slot; `None` when no definition row exists
    async fn set_level_permission(
        &self,
        account: &str,
        category_header: &str,
        category_sub_header: &str,
        level: AccessLevel,
        allowed: bool,
    ) -> Result<Option<AccessLevelDefinition>, DatabaseError>;
}

/// Everything the HTTP layer needs from persistence
pub trait Store: LevelStore + GrantStore + AccessMatrixStore {}

impl<T> Store for T where T: LevelStore + GrantStore + AccessMatrixStore {}
