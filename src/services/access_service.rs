use thiserror::Error;
use tracing::info;

use crate::authz::{AccessDecision, AccessLevel, AccessMatrix, AccessMatrixStore, AuthzError, PermissionVector};
use crate::database::manager::DatabaseError;
use crate::database::models::{AccessLevelDefinition, ApiAccessCategory};

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Category header and sub-header must not be empty")]
    EmptyCategory,

    #[error("No access level definition for {category_header}/{category_sub_header}")]
    DefinitionNotFound {
        category_header: String,
        category_sub_header: String,
    },

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Administration of the per-account permission matrix and user access levels
pub struct AccessService<'a, S: AccessMatrixStore + ?Sized> {
    store: &'a S,
    matrix: AccessMatrix<'a, S>,
}

impl<'a, S: AccessMatrixStore + ?Sized> AccessService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            matrix: AccessMatrix::new(store),
        }
    }

    pub fn with_matrix(store: &'a S, matrix: AccessMatrix<'a, S>) -> Self {
        Self { store, matrix }
    }

    pub async fn list_definitions(&self, account: &str) -> Result<Vec<AccessLevelDefinition>, AccessError> {
        Ok(self.store.list_definitions(account).await?)
    }

    pub async fn list_api_categories(&self) -> Result<Vec<ApiAccessCategory>, AccessError> {
        Ok(self.store.list_api_categories().await?)
    }

    /// Replace the whole permission vector of a capability
    pub async fn upsert_definition(
        &self,
        account: &str,
        category_header: &str,
        category_sub_header: &str,
        level_grants: PermissionVector,
    ) -> Result<AccessLevelDefinition, AccessError> {
        let (header, sub_header) = non_empty(category_header, category_sub_header)?;
        let definition = self
            .store
            .upsert_definition(account, header, sub_header, level_grants)
            .await?;

        info!(
            "Access levels for {}/{} in '{}' set to {:?}",
            header,
            sub_header,
            account,
            definition.level_grants.allowed_levels()
        );
        Ok(definition)
    }

    /// Flip one access level's slot of an existing definition
    pub async fn set_level_permission(
        &self,
        account: &str,
        category_header: &str,
        category_sub_header: &str,
        level: AccessLevel,
        allowed: bool,
    ) -> Result<AccessLevelDefinition, AccessError> {
        let (header, sub_header) = non_empty(category_header, category_sub_header)?;
        let definition = self
            .store
            .set_level_permission(account, header, sub_header, level, allowed)
            .await?
            .ok_or_else(|| AccessError::DefinitionNotFound {
                category_header: header.to_string(),
                category_sub_header: sub_header.to_string(),
            })?;

        info!(
            "Access level {} {} for {}/{} in '{}'",
            level,
            if allowed { "granted" } else { "revoked" },
            header,
            sub_header,
            account
        );
        Ok(definition)
    }

    /// Set the account default, or the override for one project
    pub async fn set_user_access_level(
        &self,
        account: &str,
        user_id: &str,
        project_id: Option<&str>,
        level: AccessLevel,
    ) -> Result<(), AccessError> {
        match project_id {
            Some(project_id) => {
                self.store
                    .set_project_access_level(account, user_id, project_id, level)
                    .await?;
                info!(
                    "User '{}' in '{}' set to access level {} for project '{}'",
                    user_id, account, level, project_id
                );
            }
            None => {
                self.store.set_account_access_level(account, user_id, level).await?;
                info!("User '{}' in '{}' set to access level {}", user_id, account, level);
            }
        }
        Ok(())
    }

    pub async fn check(
        &self,
        account: &str,
        user_id: &str,
        project_id: Option<&str>,
        category_header: &str,
        category_sub_header: &str,
    ) -> Result<AccessDecision, AccessError> {
        let (header, sub_header) = non_empty(category_header, category_sub_header)?;
        Ok(self
            .matrix
            .check(account, user_id, project_id, header, sub_header)
            .await?)
    }
}

fn non_empty<'s>(header: &'s str, sub_header: &'s str) -> Result<(&'s str, &'s str), AccessError> {
    let (header, sub_header) = (header.trim(), sub_header.trim());
    if header.is_empty() || sub_header.is_empty() {
        return Err(AccessError::EmptyCategory);
    }
    Ok((header, sub_header))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;

    fn level(n: u8) -> AccessLevel {
        AccessLevel::new(n).unwrap()
    }

    fn service(store: &MemoryStore) -> AccessService<'_, MemoryStore> {
        AccessService::with_matrix(store, AccessMatrix::with_fallback_level(store, AccessLevel::LOWEST))
    }

    #[tokio::test]
    async fn toggling_a_slot_changes_the_answer() {
        let store = MemoryStore::new();
        let access = service(&store);
        access
            .upsert_definition("ACME", "Approvals", "Approve", PermissionVector::from_levels([level(7), level(8), level(9)]))
            .await
            .unwrap();
        access.set_user_access_level("ACME", "u1", None, level(5)).await.unwrap();

        assert!(!access.check("ACME", "u1", None, "Approvals", "Approve").await.unwrap().allowed);
        access
            .set_level_permission("ACME", "Approvals", "Approve", level(5), true)
            .await
            .unwrap();
        assert!(access.check("ACME", "u1", None, "Approvals", "Approve").await.unwrap().allowed);
    }

    #[tokio::test]
    async fn project_override_is_scoped() {
        let store = MemoryStore::new();
        let access = service(&store);
        access
            .upsert_definition("ACME", "Functional Levels", "Create", PermissionVector::from_levels([level(6)]))
            .await
            .unwrap();
        access.set_user_access_level("ACME", "u1", Some("P1"), level(6)).await.unwrap();

        assert!(access.check("ACME", "u1", Some("P1"), "Functional Levels", "Create").await.unwrap().allowed);
        assert!(!access.check("ACME", "u1", Some("P2"), "Functional Levels", "Create").await.unwrap().allowed);
    }

    #[tokio::test]
    async fn toggling_undefined_capability_is_not_found() {
        let store = MemoryStore::new();
        let err = service(&store)
            .set_level_permission("ACME", "Reports", "Export", level(1), true)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::DefinitionNotFound { .. }));
    }

    #[tokio::test]
    async fn blank_category_is_rejected() {
        let store = MemoryStore::new();
        let err = service(&store)
            .upsert_definition("ACME", "", "Approve", PermissionVector::none())
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::EmptyCategory));
    }
}
