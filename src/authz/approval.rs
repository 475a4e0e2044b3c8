use tracing::debug;

use super::error::AuthzError;
use super::hierarchy::{LevelHierarchy, PathEnd};
use super::scope::AuthScope;
use super::store::{GrantStore, LevelStore};
use crate::types::{LevelId, ProjectScope, RequirementId, ROOT_PARENT};

/// Decides whether a user may approve a target, honoring grant inheritance:
/// a project grant covers everything, a level grant covers that level, every
/// level below it and every requirement filed under those levels.
pub struct ApprovalAuthorizer<'a, S: LevelStore + GrantStore + ?Sized> {
    store: &'a S,
    hierarchy: LevelHierarchy<'a, S>,
}

impl<'a, S: LevelStore + GrantStore + ?Sized> ApprovalAuthorizer<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            hierarchy: LevelHierarchy::new(store),
        }
    }

    pub fn with_hierarchy(store: &'a S, hierarchy: LevelHierarchy<'a, S>) -> Self {
        Self { store, hierarchy }
    }

    pub async fn is_user_authorized_to_approve(
        &self,
        scope: &ProjectScope,
        approval_user_id: &str,
        target: AuthScope,
    ) -> Result<bool, AuthzError> {
        if self.store.has_project_grant(scope, approval_user_id).await? {
            debug!("User '{}' holds a project grant in {}", approval_user_id, scope);
            return Ok(true);
        }

        let authorized = match target {
            AuthScope::Project => false,
            AuthScope::Requirement(req_id) => self.requirement_check(scope, approval_user_id, req_id).await?,
            AuthScope::Level(level_id) => self.level_check(scope, approval_user_id, level_id).await?,
        };

        debug!(
            "User '{}' {} to approve {} in {}",
            approval_user_id,
            if authorized { "authorized" } else { "not authorized" },
            target,
            scope
        );
        Ok(authorized)
    }

    /// Entry point for callers holding the raw optional id pair
    pub async fn is_user_authorized_for_ids(
        &self,
        scope: &ProjectScope,
        approval_user_id: &str,
        req_id: Option<RequirementId>,
        level_id: Option<LevelId>,
    ) -> Result<bool, AuthzError> {
        let target = AuthScope::from_ids(req_id, level_id)?;
        self.is_user_authorized_to_approve(scope, approval_user_id, target).await
    }

    async fn requirement_check(
        &self,
        scope: &ProjectScope,
        user_id: &str,
        req_id: RequirementId,
    ) -> Result<bool, AuthzError> {
        if self.store.has_requirement_grant(scope, user_id, req_id).await? {
            return Ok(true);
        }

        // A requirement id may live in either table
        let level_id = match self.store.requirement_level(scope, req_id).await? {
            Some(level_id) => level_id,
            None => match self.store.integration_requirement_level(scope, req_id).await? {
                Some(level_id) => level_id,
                None => {
                    debug!("Requirement {} not found in {}", req_id, scope);
                    return Ok(false);
                }
            },
        };

        self.level_check(scope, user_id, level_id).await
    }

    async fn level_check(&self, scope: &ProjectScope, user_id: &str, level_id: LevelId) -> Result<bool, AuthzError> {
        if level_id == ROOT_PARENT {
            return Ok(false);
        }

        let path = self.hierarchy.path(scope, level_id).await?;
        if self.store.has_level_grant(scope, user_id, &path.levels).await? {
            return Ok(true);
        }

        // A hop-capped walk answers from the levels it reached; a cycle means
        // the tree is corrupt and is reported
        match path.end {
            PathEnd::Root | PathEnd::MissingLevel(_) | PathEnd::DepthLimit => Ok(false),
            PathEnd::Cycle(at) => Err(AuthzError::HierarchyCycle { level_id: at }),
        }
    }
}
