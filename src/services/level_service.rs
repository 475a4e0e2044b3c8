use thiserror::Error;
use tracing::{debug, info};

use crate::authz::{AuthzError, HierarchyPath, LevelHierarchy, LevelStore};
use crate::database::manager::DatabaseError;
use crate::database::models::{
    FunctionalLevel, LevelChanges, LevelDependents, LevelStatus, NewLevel, Reparent, ROOT_LEVEL_DESCRIPTION,
};
use crate::types::{LevelId, ProjectScope, ROOT_PARENT};

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("Functional level {0} not found")]
    NotFound(LevelId),

    #[error("Parent level {0} not found")]
    ParentNotFound(LevelId),

    #[error("Level description must not be empty")]
    EmptyDescription,

    #[error("Moving level {level_id} under {parent_level_id} would create a cycle")]
    WouldCreateCycle { level_id: LevelId, parent_level_id: LevelId },

    #[error("Functional level {level_id} still has dependents")]
    HasDependents { level_id: LevelId, dependents: LevelDependents },

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Write-side operations on a project's functional level tree
pub struct LevelService<'a, S: LevelStore + ?Sized> {
    store: &'a S,
    hierarchy: LevelHierarchy<'a, S>,
}

impl<'a, S: LevelStore + ?Sized> LevelService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            hierarchy: LevelHierarchy::new(store),
        }
    }

    pub fn with_hierarchy(store: &'a S, hierarchy: LevelHierarchy<'a, S>) -> Self {
        Self { store, hierarchy }
    }

    pub async fn list_levels(&self, scope: &ProjectScope) -> Result<Vec<FunctionalLevel>, LevelError> {
        Ok(self.store.list_levels(scope).await?)
    }

    pub async fn get_level(&self, scope: &ProjectScope, level_id: LevelId) -> Result<FunctionalLevel, LevelError> {
        self.store
            .get_level(scope, level_id)
            .await?
            .ok_or(LevelError::NotFound(level_id))
    }

    /// Ancestor path of an existing level, nearest first
    pub async fn level_path(&self, scope: &ProjectScope, level_id: LevelId) -> Result<HierarchyPath, LevelError> {
        self.get_level(scope, level_id).await?;
        Ok(self.hierarchy.path(scope, level_id).await?)
    }

    /// The scope's root level, created on first use
    pub async fn root_level(
        &self,
        scope: &ProjectScope,
        created_by: Option<&str>,
    ) -> Result<FunctionalLevel, LevelError> {
        let levels = self.store.list_levels(scope).await?;
        if let Some(root) = levels.into_iter().filter(FunctionalLevel::is_root).min_by_key(|l| l.level_id) {
            return Ok(root);
        }

        let root = self
            .store
            .insert_level(
                scope,
                NewLevel {
                    parent_level_id: ROOT_PARENT,
                    level_description: ROOT_LEVEL_DESCRIPTION.to_string(),
                    created_by: created_by.map(str::to_string),
                },
            )
            .await?;
        info!("Created root level {} for {}", root.level_id, scope);
        Ok(root)
    }

    /// Create a level. A missing or zero parent attaches it under the root level.
    pub async fn create_level(
        &self,
        scope: &ProjectScope,
        level_description: &str,
        parent_level_id: Option<LevelId>,
        created_by: Option<&str>,
    ) -> Result<FunctionalLevel, LevelError> {
        let level_description = level_description.trim();
        if level_description.is_empty() {
            return Err(LevelError::EmptyDescription);
        }

        let parent_level_id = match parent_level_id.filter(|id| *id != ROOT_PARENT) {
            Some(parent) => {
                if self.store.get_level(scope, parent).await?.is_none() {
                    return Err(LevelError::ParentNotFound(parent));
                }
                parent
            }
            None => self.root_level(scope, created_by).await?.level_id,
        };

        let level = self
            .store
            .insert_level(
                scope,
                NewLevel {
                    parent_level_id,
                    level_description: level_description.to_string(),
                    created_by: created_by.map(str::to_string),
                },
            )
            .await?;

        info!(
            "Created level {} under {} in {}",
            level.level_id, level.parent_level_id, scope
        );
        Ok(level)
    }

    /// Change description and/or status. The parent is changed through [`LevelService::move_level`].
    pub async fn update_level(
        &self,
        scope: &ProjectScope,
        level_id: LevelId,
        level_description: Option<&str>,
        status: Option<LevelStatus>,
    ) -> Result<FunctionalLevel, LevelError> {
        let level_description = match level_description.map(str::trim) {
            Some("") => return Err(LevelError::EmptyDescription),
            other => other.map(str::to_string),
        };

        let changes = LevelChanges {
            level_description,
            status,
        };
        if changes.is_empty() {
            return self.get_level(scope, level_id).await;
        }

        self.store
            .update_level(scope, level_id, changes)
            .await?
            .ok_or(LevelError::NotFound(level_id))
    }

    /// Reparent a level, refusing any move that would break the tree
    pub async fn move_level(
        &self,
        scope: &ProjectScope,
        level_id: LevelId,
        new_parent_level_id: LevelId,
    ) -> Result<FunctionalLevel, LevelError> {
        let level = self.get_level(scope, level_id).await?;
        if level.parent_level_id == new_parent_level_id {
            return Ok(level);
        }

        if new_parent_level_id == level_id {
            return Err(LevelError::WouldCreateCycle {
                level_id,
                parent_level_id: new_parent_level_id,
            });
        }

        if new_parent_level_id != ROOT_PARENT && self.store.get_level(scope, new_parent_level_id).await?.is_none() {
            return Err(LevelError::ParentNotFound(new_parent_level_id));
        }

        if self
            .hierarchy
            .would_create_cycle(scope, level_id, new_parent_level_id)
            .await?
        {
            debug!(
                "Refusing to move level {} under its descendant {} in {}",
                level_id, new_parent_level_id, scope
            );
            return Err(LevelError::WouldCreateCycle {
                level_id,
                parent_level_id: new_parent_level_id,
            });
        }

        // The walk above reports corrupt chains; the store re-checks under lock
        let moved = match self
            .store
            .reparent_level(scope, level_id, new_parent_level_id, self.hierarchy.max_depth())
            .await?
        {
            Reparent::Moved(level) => level,
            Reparent::LevelMissing => return Err(LevelError::NotFound(level_id)),
            Reparent::WouldCreateCycle => {
                return Err(LevelError::WouldCreateCycle {
                    level_id,
                    parent_level_id: new_parent_level_id,
                })
            }
        };

        info!(
            "Moved level {} from {} to {} in {}",
            level_id, level.parent_level_id, new_parent_level_id, scope
        );
        Ok(moved)
    }

    pub async fn delete_level(&self, scope: &ProjectScope, level_id: LevelId) -> Result<(), LevelError> {
        self.get_level(scope, level_id).await?;

        let dependents = self.store.level_dependents(scope, level_id).await?;
        if !dependents.is_empty() {
            return Err(LevelError::HasDependents { level_id, dependents });
        }

        if !self.store.delete_level(scope, level_id).await? {
            return Err(LevelError::NotFound(level_id));
        }

        info!("Deleted level {} from {}", level_id, scope);
        Ok(())
    }
}
