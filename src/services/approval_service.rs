use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::authz::{ApprovalAuthorizer, AuthScope, AuthzError, GrantStore, LevelStore};
use crate::database::manager::DatabaseError;
use crate::database::models::{ApprovalDecision, ApprovalStatus, ApproverGrant, DecisionRecord};
use crate::types::{LevelId, ProjectScope, RequirementId};

#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("User '{user_id}' is not authorized to approve {target}")]
    NotAuthorized { user_id: String, target: AuthScope },

    #[error("User '{user_id}' already holds an approver grant on {target}")]
    DuplicateGrant { user_id: String, target: AuthScope },

    #[error("No approver grant for user '{user_id}' on {target}")]
    GrantNotFound { user_id: String, target: AuthScope },

    #[error("Functional level {0} not found")]
    LevelNotFound(LevelId),

    #[error("Requirement {0} not found")]
    RequirementNotFound(RequirementId),

    #[error("Approval status must be Approved or Rejected")]
    PendingDecision,

    #[error("Approval user id must not be empty")]
    EmptyUserId,

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Answer of the explicit authorization check
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationCheck {
    pub approval_user_id: String,
    pub target: AuthScope,
    pub authorized: bool,
}

/// Approver grant management and the approval status update
pub struct ApprovalService<'a, S: LevelStore + GrantStore + ?Sized> {
    store: &'a S,
    authorizer: ApprovalAuthorizer<'a, S>,
}

impl<'a, S: LevelStore + GrantStore + ?Sized> ApprovalService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            authorizer: ApprovalAuthorizer::new(store),
        }
    }

    pub fn with_authorizer(store: &'a S, authorizer: ApprovalAuthorizer<'a, S>) -> Self {
        Self { store, authorizer }
    }

    pub async fn list_grants(
        &self,
        scope: &ProjectScope,
        user_id: Option<&str>,
    ) -> Result<Vec<ApproverGrant>, ApprovalError> {
        Ok(self.store.list_grants(scope, user_id).await?)
    }

    /// Grant approval authority; the target level or requirement must exist
    pub async fn add_grant(
        &self,
        scope: &ProjectScope,
        user_id: &str,
        target: AuthScope,
    ) -> Result<ApproverGrant, ApprovalError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(ApprovalError::EmptyUserId);
        }

        match target {
            AuthScope::Project => {}
            AuthScope::Level(level_id) => {
                if self.store.get_level(scope, level_id).await?.is_none() {
                    return Err(ApprovalError::LevelNotFound(level_id));
                }
            }
            AuthScope::Requirement(req_id) => {
                let known = self.store.requirement_level(scope, req_id).await?.is_some()
                    || self.store.integration_requirement_level(scope, req_id).await?.is_some();
                if !known {
                    return Err(ApprovalError::RequirementNotFound(req_id));
                }
            }
        }

        let grant = self
            .store
            .insert_grant(scope, user_id, target)
            .await?
            .ok_or_else(|| ApprovalError::DuplicateGrant {
                user_id: user_id.to_string(),
                target,
            })?;

        info!("Granted '{}' approval on {} in {}", user_id, target, scope);
        Ok(grant)
    }

    pub async fn remove_grant(&self, scope: &ProjectScope, user_id: &str, target: AuthScope) -> Result<(), ApprovalError> {
        if !self.store.delete_grant(scope, user_id, target).await? {
            return Err(ApprovalError::GrantNotFound {
                user_id: user_id.to_string(),
                target,
            });
        }

        info!("Revoked '{}' approval on {} in {}", user_id, target, scope);
        Ok(())
    }

    pub async fn check(
        &self,
        scope: &ProjectScope,
        user_id: &str,
        target: AuthScope,
    ) -> Result<AuthorizationCheck, ApprovalError> {
        let authorized = self.authorizer.is_user_authorized_to_approve(scope, user_id, target).await?;
        Ok(AuthorizationCheck {
            approval_user_id: user_id.to_string(),
            target,
            authorized,
        })
    }

    pub async fn list_decisions(
        &self,
        scope: &ProjectScope,
        target: AuthScope,
    ) -> Result<Vec<DecisionRecord>, ApprovalError> {
        Ok(self.store.list_decisions(scope, target).await?)
    }

    /// Record an approver's decision. Nothing is written unless the approver is
    /// authorized for the target or one of its ancestors, and the approver's
    /// grants are never changed.
    pub async fn update_approval_status(
        &self,
        scope: &ProjectScope,
        decision: ApprovalDecision,
    ) -> Result<DecisionRecord, ApprovalError> {
        if decision.approval_status == ApprovalStatus::Pending {
            return Err(ApprovalError::PendingDecision);
        }

        let authorized = self
            .authorizer
            .is_user_authorized_to_approve(scope, &decision.approval_user_id, decision.target)
            .await?;
        if !authorized {
            warn!(
                "Rejected approval by '{}' on {} in {}",
                decision.approval_user_id, decision.target, scope
            );
            return Err(ApprovalError::NotAuthorized {
                user_id: decision.approval_user_id,
                target: decision.target,
            });
        }

        let record = self.store.record_decision(scope, &decision).await?;
        info!(
            "'{}' marked {} as {} in {}",
            decision.approval_user_id,
            decision.target,
            decision.approval_status.as_str(),
            scope
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::LevelHierarchy;
    use crate::testing::MemoryStore;

    fn acme() -> ProjectScope {
        ProjectScope::new("ACME", "P1")
    }

    fn service(store: &MemoryStore) -> ApprovalService<'_, MemoryStore> {
        let authorizer = ApprovalAuthorizer::with_hierarchy(store, LevelHierarchy::with_max_depth(store, 100));
        ApprovalService::with_authorizer(store, authorizer)
    }

    async fn org_chart() -> MemoryStore {
        let store = MemoryStore::new();
        store.put_level(&acme(), 10, 0).await;
        store.put_level(&acme(), 20, 10).await;
        store.put_requirement(&acme(), 5, 20).await;
        store
    }

    fn approve(user: &str, target: AuthScope) -> ApprovalDecision {
        ApprovalDecision {
            target,
            approval_user_id: user.to_string(),
            approval_status: ApprovalStatus::Approved,
            approver_comments: Some("looks good".to_string()),
        }
    }

    #[tokio::test]
    async fn grants_require_existing_targets() {
        let store = org_chart().await;
        let approvals = service(&store);

        approvals.add_grant(&acme(), "u1", AuthScope::Level(10)).await.unwrap();
        approvals.add_grant(&acme(), "u2", AuthScope::Requirement(5)).await.unwrap();
        approvals.add_grant(&acme(), "admin", AuthScope::Project).await.unwrap();

        assert!(matches!(
            approvals.add_grant(&acme(), "u1", AuthScope::Level(99)).await.unwrap_err(),
            ApprovalError::LevelNotFound(99)
        ));
        assert!(matches!(
            approvals.add_grant(&acme(), "u1", AuthScope::Requirement(99)).await.unwrap_err(),
            ApprovalError::RequirementNotFound(99)
        ));
        assert!(matches!(
            approvals.add_grant(&acme(), "u1", AuthScope::Level(10)).await.unwrap_err(),
            ApprovalError::DuplicateGrant { .. }
        ));
        assert!(matches!(
            approvals.add_grant(&acme(), " ", AuthScope::Project).await.unwrap_err(),
            ApprovalError::EmptyUserId
        ));

        assert_eq!(approvals.list_grants(&acme(), None).await.unwrap().len(), 3);
        let mine = approvals.list_grants(&acme(), Some("u1")).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].target(), AuthScope::Level(10));
    }

    #[tokio::test]
    async fn authorized_decision_is_recorded() {
        let store = org_chart().await;
        let approvals = service(&store);
        approvals.add_grant(&acme(), "u1", AuthScope::Level(10)).await.unwrap();

        let row = approvals
            .update_approval_status(&acme(), approve("u1", AuthScope::Requirement(5)))
            .await
            .unwrap();
        assert_eq!(row.approval_status, ApprovalStatus::Approved);
        assert_eq!(row.target(), AuthScope::Requirement(5));
        assert_eq!(row.approver_comments.as_deref(), Some("looks good"));

        let decisions = approvals.list_decisions(&acme(), AuthScope::Requirement(5)).await.unwrap();
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].approval_user_id, "u1");

        // A second decision by the same approver replaces the first
        let mut reject = approve("u1", AuthScope::Requirement(5));
        reject.approval_status = ApprovalStatus::Rejected;
        approvals.update_approval_status(&acme(), reject).await.unwrap();
        let decisions = approvals.list_decisions(&acme(), AuthScope::Requirement(5)).await.unwrap();
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].approval_status, ApprovalStatus::Rejected);
    }

    #[tokio::test]
    async fn deciding_under_an_inherited_grant_confers_no_authority() {
        let store = org_chart().await;
        store.put_level(&acme(), 30, 20).await;
        store.put_requirement(&acme(), 7, 30).await;
        let approvals = service(&store);
        approvals.add_grant(&acme(), "u1", AuthScope::Level(10)).await.unwrap();

        approvals
            .update_approval_status(&acme(), approve("u1", AuthScope::Level(20)))
            .await
            .unwrap();
        approvals
            .update_approval_status(&acme(), approve("u1", AuthScope::Requirement(5)))
            .await
            .unwrap();

        let grants = approvals.list_grants(&acme(), Some("u1")).await.unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].target(), AuthScope::Level(10));

        approvals.remove_grant(&acme(), "u1", AuthScope::Level(10)).await.unwrap();
        for target in [AuthScope::Requirement(7), AuthScope::Requirement(5), AuthScope::Level(20)] {
            assert!(!approvals.check(&acme(), "u1", target).await.unwrap().authorized);
        }
        assert!(approvals.list_grants(&acme(), Some("u1")).await.unwrap().is_empty());
        // The decisions themselves survive the revocation
        assert_eq!(approvals.list_decisions(&acme(), AuthScope::Level(20)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unauthorized_decision_writes_nothing() {
        let store = org_chart().await;
        let approvals = service(&store);
        approvals.add_grant(&acme(), "u1", AuthScope::Level(20)).await.unwrap();

        let err = approvals
            .update_approval_status(&acme(), approve("u1", AuthScope::Level(10)))
            .await
            .unwrap_err();
        assert!(matches!(err, ApprovalError::NotAuthorized { .. }));
        assert_eq!(approvals.list_grants(&acme(), None).await.unwrap().len(), 1);
        assert!(approvals.list_decisions(&acme(), AuthScope::Level(10)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pending_is_not_a_decision() {
        let store = org_chart().await;
        let mut decision = approve("u1", AuthScope::Project);
        decision.approval_status = ApprovalStatus::Pending;
        assert!(matches!(
            service(&store).update_approval_status(&acme(), decision).await.unwrap_err(),
            ApprovalError::PendingDecision
        ));
    }

    #[tokio::test]
    async fn revoking_a_grant_revokes_authority() {
        let store = org_chart().await;
        let approvals = service(&store);
        approvals.add_grant(&acme(), "u1", AuthScope::Level(10)).await.unwrap();

        assert!(approvals.check(&acme(), "u1", AuthScope::Requirement(5)).await.unwrap().authorized);
        approvals.remove_grant(&acme(), "u1", AuthScope::Level(10)).await.unwrap();
        assert!(!approvals.check(&acme(), "u1", AuthScope::Requirement(5)).await.unwrap().authorized);

        assert!(matches!(
            approvals.remove_grant(&acme(), "u1", AuthScope::Level(10)).await.unwrap_err(),
            ApprovalError::GrantNotFound { .. }
        ));
    }

    #[tokio::test]
    async fn database_failure_is_an_error_not_a_denial() {
        let store = org_chart().await;
        store.fail_queries(true);
        let err = service(&store)
            .check(&acme(), "u1", AuthScope::Requirement(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ApprovalError::Authz(AuthzError::Database(_))));
    }
}
