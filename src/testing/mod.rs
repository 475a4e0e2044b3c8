//! In-memory store for unit and router tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use crate::authz::{AccessLevel, AccessMatrixStore, AuthScope, GrantStore, LevelStore, PermissionVector};
use crate::database::manager::DatabaseError;
use crate::database::models::{
    AccessLevelDefinition, ApiAccessCategory, ApprovalDecision, ApprovalStatus, ApproverGrant, DecisionRecord,
    FunctionalLevel, LevelChanges, LevelDependents, LevelStatus, NewLevel, Reparent,
};
use crate::types::{LevelId, ProjectScope, RequirementId, ROOT_PARENT};

type ScopeKey = (String, String);
type GrantKey = (String, String, RequirementId, LevelId, String);

fn scope_key(scope: &ProjectScope) -> ScopeKey {
    (scope.corporate_account.clone(), scope.project_id.clone())
}

fn grant_key(scope: &ProjectScope, user_id: &str, target: AuthScope) -> GrantKey {
    let (req_id, level_id) = target.to_columns();
    (
        scope.corporate_account.clone(),
        scope.project_id.clone(),
        req_id,
        level_id,
        user_id.to_string(),
    )
}

/// Same mapping the initial migration seeds
const DEFAULT_API_CATEGORIES: &[(&str, &str, &str)] = &[
    ("create_functional_level", "Functional Levels", "Create"),
    ("update_functional_level", "Functional Levels", "Update"),
    ("move_functional_level", "Functional Levels", "Update"),
    ("delete_functional_level", "Functional Levels", "Delete"),
    ("add_requirement_approver", "Approvals", "Manage Approvers"),
    ("delete_requirement_approver", "Approvals", "Manage Approvers"),
    ("update_requirement_approval_status", "Approvals", "Approve"),
    ("update_access_levels", "Administration", "Access Levels"),
    ("update_user_access_level", "Administration", "User Access"),
];

#[derive(Default)]
struct Tables {
    levels: BTreeMap<(String, String, LevelId), FunctionalLevel>,
    sequences: HashMap<ScopeKey, LevelId>,
    requirements: HashMap<(String, String, RequirementId), LevelId>,
    integration_requirements: HashMap<(String, String, RequirementId), LevelId>,
    grants: BTreeMap<GrantKey, ApproverGrant>,
    decisions: BTreeMap<GrantKey, DecisionRecord>,
    account_levels: HashMap<(String, String), i16>,
    project_levels: HashMap<(String, String, String), i16>,
    api_categories: BTreeMap<String, ApiAccessCategory>,
    definitions: BTreeMap<(String, String, String), AccessLevelDefinition>,
}

/// Implements every store trait over plain maps.
///
/// `fail_queries(true)` makes every trait call return a database error, which
/// is how tests reach the error paths of the services and handlers.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_api_categories() -> Self {
        let mut tables = Tables::default();
        for (api_name, header, sub_header) in DEFAULT_API_CATEGORIES {
            tables.api_categories.insert(
                api_name.to_string(),
                ApiAccessCategory {
                    api_name: api_name.to_string(),
                    category_header: header.to_string(),
                    category_sub_header: sub_header.to_string(),
                },
            );
        }
        Self {
            tables: RwLock::new(tables),
            failing: AtomicBool::new(false),
        }
    }

    pub fn fail_queries(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), DatabaseError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(DatabaseError::QueryError("simulated database failure".to_string()))
        } else {
            Ok(())
        }
    }

    /// Insert a level row with an explicit id, bypassing parent validation
    pub async fn put_level(&self, scope: &ProjectScope, level_id: LevelId, parent_level_id: LevelId) {
        let now = Utc::now();
        let mut tables = self.tables.write().await;
        tables.levels.insert(
            (scope.corporate_account.clone(), scope.project_id.clone(), level_id),
            FunctionalLevel {
                corporate_account: scope.corporate_account.clone(),
                project_id: scope.project_id.clone(),
                level_id,
                parent_level_id,
                level_description: format!("Level {}", level_id),
                status: LevelStatus::Active,
                created_by: None,
                created_at: now,
                updated_at: now,
            },
        );
        let last = tables.sequences.entry(scope_key(scope)).or_insert(0);
        *last = (*last).max(level_id);
    }

    pub async fn put_requirement(&self, scope: &ProjectScope, req_id: RequirementId, level_id: LevelId) {
        self.tables
            .write()
            .await
            .requirements
            .insert((scope.corporate_account.clone(), scope.project_id.clone(), req_id), level_id);
    }

    pub async fn put_integration_requirement(&self, scope: &ProjectScope, req_id: RequirementId, level_id: LevelId) {
        self.tables
            .write()
            .await
            .integration_requirements
            .insert((scope.corporate_account.clone(), scope.project_id.clone(), req_id), level_id);
    }

    /// Store a raw access level, including values the real schema would reject
    pub async fn force_account_access_level(&self, account: &str, user_id: &str, level: i16) {
        self.tables
            .write()
            .await
            .account_levels
            .insert((account.to_string(), user_id.to_string()), level);
    }
}

#[async_trait]
impl LevelStore for MemoryStore {
    async fn parent_of(&self, scope: &ProjectScope, level_id: LevelId) -> Result<Option<LevelId>, DatabaseError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .levels
            .get(&(scope.corporate_account.clone(), scope.project_id.clone(), level_id))
            .map(|level| level.parent_level_id))
    }

    async fn get_level(&self, scope: &ProjectScope, level_id: LevelId) -> Result<Option<FunctionalLevel>, DatabaseError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .levels
            .get(&(scope.corporate_account.clone(), scope.project_id.clone(), level_id))
            .cloned())
    }

    async fn list_levels(&self, scope: &ProjectScope) -> Result<Vec<FunctionalLevel>, DatabaseError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .levels
            .values()
            .filter(|level| level.corporate_account == scope.corporate_account && level.project_id == scope.project_id)
            .cloned()
            .collect())
    }

    async fn insert_level(&self, scope: &ProjectScope, level: NewLevel) -> Result<FunctionalLevel, DatabaseError> {
        self.check()?;
        let mut tables = self.tables.write().await;

        let last = tables.sequences.get(&scope_key(scope)).copied().unwrap_or(0);
        let mut level_id = last + 1;
        while tables
            .levels
            .contains_key(&(scope.corporate_account.clone(), scope.project_id.clone(), level_id))
        {
            level_id += 1;
        }
        tables.sequences.insert(scope_key(scope), level_id);

        let now = Utc::now();
        let created = FunctionalLevel {
            corporate_account: scope.corporate_account.clone(),
            project_id: scope.project_id.clone(),
            level_id,
            parent_level_id: level.parent_level_id,
            level_description: level.level_description,
            status: LevelStatus::Active,
            created_by: level.created_by,
            created_at: now,
            updated_at: now,
        };
        tables.levels.insert(
            (scope.corporate_account.clone(), scope.project_id.clone(), level_id),
            created.clone(),
        );
        Ok(created)
    }

    async fn update_level(
        &self,
        scope: &ProjectScope,
        level_id: LevelId,
        changes: LevelChanges,
    ) -> Result<Option<FunctionalLevel>, DatabaseError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let Some(level) = tables
            .levels
            .get_mut(&(scope.corporate_account.clone(), scope.project_id.clone(), level_id))
        else {
            return Ok(None);
        };

        if let Some(description) = changes.level_description {
            level.level_description = description;
        }
        if let Some(status) = changes.status {
            level.status = status;
        }
        level.updated_at = Utc::now();
        Ok(Some(level.clone()))
    }

    async fn reparent_level(
        &self,
        scope: &ProjectScope,
        level_id: LevelId,
        new_parent_level_id: LevelId,
        max_depth: usize,
    ) -> Result<Reparent, DatabaseError> {
        self.check()?;
        // The write lock spans the check and the update
        let mut tables = self.tables.write().await;
        let key = |id: LevelId| (scope.corporate_account.clone(), scope.project_id.clone(), id);

        let mut current = new_parent_level_id;
        for _ in 0..=max_depth {
            if current == level_id {
                return Ok(Reparent::WouldCreateCycle);
            }
            match tables.levels.get(&key(current)) {
                Some(level) if current != ROOT_PARENT => current = level.parent_level_id,
                _ => break,
            }
        }

        match tables.levels.get_mut(&key(level_id)) {
            Some(level) => {
                level.parent_level_id = new_parent_level_id;
                level.updated_at = Utc::now();
                Ok(Reparent::Moved(level.clone()))
            }
            None => Ok(Reparent::LevelMissing),
        }
    }

    async fn level_dependents(&self, scope: &ProjectScope, level_id: LevelId) -> Result<LevelDependents, DatabaseError> {
        self.check()?;
        let tables = self.tables.read().await;
        let in_scope = |acct: &String, proj: &String| acct == &scope.corporate_account && proj == &scope.project_id;

        let count = |map: &HashMap<(String, String, RequirementId), LevelId>| {
            map.iter()
                .filter(|((acct, proj, _), level)| in_scope(acct, proj) && **level == level_id)
                .count() as i64
        };

        Ok(LevelDependents {
            child_levels: tables
                .levels
                .values()
                .filter(|level| in_scope(&level.corporate_account, &level.project_id) && level.parent_level_id == level_id)
                .count() as i64,
            requirements: count(&tables.requirements),
            integration_requirements: count(&tables.integration_requirements),
            approver_grants: tables
                .grants
                .keys()
                .filter(|(acct, proj, req, level, _)| in_scope(acct, proj) && *req == 0 && *level == level_id)
                .count() as i64,
        })
    }

    async fn delete_level(&self, scope: &ProjectScope, level_id: LevelId) -> Result<bool, DatabaseError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        Ok(tables
            .levels
            .remove(&(scope.corporate_account.clone(), scope.project_id.clone(), level_id))
            .is_some())
    }

    async fn requirement_level(
        &self,
        scope: &ProjectScope,
        req_id: RequirementId,
    ) -> Result<Option<LevelId>, DatabaseError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .requirements
            .get(&(scope.corporate_account.clone(), scope.project_id.clone(), req_id))
            .copied())
    }

    async fn integration_requirement_level(
        &self,
        scope: &ProjectScope,
        req_id: RequirementId,
    ) -> Result<Option<LevelId>, DatabaseError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .integration_requirements
            .get(&(scope.corporate_account.clone(), scope.project_id.clone(), req_id))
            .copied())
    }
}

#[async_trait]
impl GrantStore for MemoryStore {
    async fn has_project_grant(&self, scope: &ProjectScope, user_id: &str) -> Result<bool, DatabaseError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables.grants.contains_key(&grant_key(scope, user_id, AuthScope::Project)))
    }

    async fn has_requirement_grant(
        &self,
        scope: &ProjectScope,
        user_id: &str,
        req_id: RequirementId,
    ) -> Result<bool, DatabaseError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .grants
            .contains_key(&grant_key(scope, user_id, AuthScope::Requirement(req_id))))
    }

    async fn has_level_grant(
        &self,
        scope: &ProjectScope,
        user_id: &str,
        level_ids: &[LevelId],
    ) -> Result<bool, DatabaseError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(level_ids
            .iter()
            .any(|level_id| tables.grants.contains_key(&grant_key(scope, user_id, AuthScope::Level(*level_id)))))
    }

    async fn list_grants(
        &self,
        scope: &ProjectScope,
        user_id: Option<&str>,
    ) -> Result<Vec<ApproverGrant>, DatabaseError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .grants
            .values()
            .filter(|grant| {
                grant.corporate_account == scope.corporate_account
                    && grant.project_id == scope.project_id
                    && user_id.map_or(true, |user| grant.approval_user_id == user)
            })
            .cloned()
            .collect())
    }

    async fn insert_grant(
        &self,
        scope: &ProjectScope,
        user_id: &str,
        target: AuthScope,
    ) -> Result<Option<ApproverGrant>, DatabaseError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let key = grant_key(scope, user_id, target);
        if tables.grants.contains_key(&key) {
            return Ok(None);
        }

        let (req_id, level_id) = target.to_columns();
        let now = Utc::now();
        let grant = ApproverGrant {
            corporate_account: scope.corporate_account.clone(),
            project_id: scope.project_id.clone(),
            req_id,
            level_id,
            approval_user_id: user_id.to_string(),
            approval_status: ApprovalStatus::Pending,
            approver_comments: None,
            created_at: now,
            updated_at: now,
        };
        tables.grants.insert(key, grant.clone());
        Ok(Some(grant))
    }

    async fn record_decision(
        &self,
        scope: &ProjectScope,
        decision: &ApprovalDecision,
    ) -> Result<DecisionRecord, DatabaseError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let (req_id, level_id) = decision.target.to_columns();
        let record = DecisionRecord {
            corporate_account: scope.corporate_account.clone(),
            project_id: scope.project_id.clone(),
            req_id,
            level_id,
            approval_user_id: decision.approval_user_id.clone(),
            approval_status: decision.approval_status,
            approver_comments: decision.approver_comments.clone(),
            decided_at: Utc::now(),
        };
        tables.decisions.insert(
            grant_key(scope, &decision.approval_user_id, decision.target),
            record.clone(),
        );
        Ok(record)
    }

    async fn list_decisions(&self, scope: &ProjectScope, target: AuthScope) -> Result<Vec<DecisionRecord>, DatabaseError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .decisions
            .values()
            .filter(|record| {
                record.corporate_account == scope.corporate_account
                    && record.project_id == scope.project_id
                    && record.target() == target
            })
            .cloned()
            .collect())
    }

    async fn delete_grant(&self, scope: &ProjectScope, user_id: &str, target: AuthScope) -> Result<bool, DatabaseError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        Ok(tables.grants.remove(&grant_key(scope, user_id, target)).is_some())
    }
}

#[async_trait]
impl AccessMatrixStore for MemoryStore {
    async fn account_access_level(&self, account: &str, user_id: &str) -> Result<Option<i16>, DatabaseError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .account_levels
            .get(&(account.to_string(), user_id.to_string()))
            .copied())
    }

    async fn project_access_level(
        &self,
        account: &str,
        user_id: &str,
        project_id: &str,
    ) -> Result<Option<i16>, DatabaseError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .project_levels
            .get(&(account.to_string(), user_id.to_string(), project_id.to_string()))
            .copied())
    }

    async fn set_account_access_level(
        &self,
        account: &str,
        user_id: &str,
        level: AccessLevel,
    ) -> Result<(), DatabaseError> {
        self.check()?;
        self.tables
            .write()
            .await
            .account_levels
            .insert((account.to_string(), user_id.to_string()), level.get() as i16);
        Ok(())
    }

    async fn set_project_access_level(
        &self,
        account: &str,
        user_id: &str,
        project_id: &str,
        level: AccessLevel,
    ) -> Result<(), DatabaseError> {
        self.check()?;
        self.tables.write().await.project_levels.insert(
            (account.to_string(), user_id.to_string(), project_id.to_string()),
            level.get() as i16,
        );
        Ok(())
    }

    async fn api_category(&self, api_name: &str) -> Result<Option<ApiAccessCategory>, DatabaseError> {
        self.check()?;
        Ok(self.tables.read().await.api_categories.get(api_name).cloned())
    }

    async fn list_api_categories(&self) -> Result<Vec<ApiAccessCategory>, DatabaseError> {
        self.check()?;
        Ok(self.tables.read().await.api_categories.values().cloned().collect())
    }

    async fn definition(
        &self,
        account: &str,
        category_header: &str,
        category_sub_header: &str,
    ) -> Result<Option<AccessLevelDefinition>, DatabaseError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .definitions
            .get(&(
                account.to_string(),
                category_header.to_string(),
                category_sub_header.to_string(),
            ))
            .cloned())
    }

    async fn list_definitions(&self, account: &str) -> Result<Vec<AccessLevelDefinition>, DatabaseError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .definitions
            .values()
            .filter(|def| def.corporate_account == account)
            .cloned()
            .collect())
    }

    async fn upsert_definition(
        &self,
        account: &str,
        category_header: &str,
        category_sub_header: &str,
        level_grants: PermissionVector,
    ) -> Result<AccessLevelDefinition, DatabaseError> {
        self.check()?;
        let definition = AccessLevelDefinition {
            corporate_account: account.to_string(),
            category_header: category_header.to_string(),
            category_sub_header: category_sub_header.to_string(),
            level_grants,
        };
        self.tables.write().await.definitions.insert(
            (
                account.to_string(),
                category_header.to_string(),
                category_sub_header.to_string(),
            ),
            definition.clone(),
        );
        Ok(definition)
    }

    async fn set_level_permission(
        &self,
        account: &str,
        category_header: &str,
        category_sub_header: &str,
        level: AccessLevel,
        allowed: bool,
    ) -> Result<Option<AccessLevelDefinition>, DatabaseError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let Some(definition) = tables.definitions.get_mut(&(
            account.to_string(),
            category_header.to_string(),
            category_sub_header.to_string(),
        )) else {
            return Ok(None);
        };
        definition.level_grants.set(level, allowed);
        Ok(Some(definition.clone()))
    }
}
