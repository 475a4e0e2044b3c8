use serde::Serialize;
use std::collections::HashSet;
use tracing::warn;

use super::error::AuthzError;
use super::store::LevelStore;
use crate::config;
use crate::types::{LevelId, ProjectScope, ROOT_PARENT};

/// Why a parent walk stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "level_id", rename_all = "snake_case")]
pub enum PathEnd {
    /// Reached a level whose parent is the root sentinel
    Root,
    /// A level in the chain has no row
    MissingLevel(LevelId),
    /// A parent pointer led back to a level already on the path
    Cycle(LevelId),
    /// The hop cap ran out before reaching the root
    DepthLimit,
}

/// A level followed by its ancestors, nearest first, excluding the root sentinel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HierarchyPath {
    pub levels: Vec<LevelId>,
    pub end: PathEnd,
}

impl HierarchyPath {
    /// False when the walk was cut short by a cycle or the hop cap
    pub fn is_complete(&self) -> bool {
        matches!(self.end, PathEnd::Root | PathEnd::MissingLevel(_))
    }

    pub fn contains(&self, level_id: LevelId) -> bool {
        self.levels.contains(&level_id)
    }
}

/// Read-only traversal of a project's functional level tree
pub struct LevelHierarchy<'a, S: LevelStore + ?Sized> {
    store: &'a S,
    max_depth: usize,
}

impl<'a, S: LevelStore + ?Sized> LevelHierarchy<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self::with_max_depth(store, config::config().authorization.max_hierarchy_depth)
    }

    pub fn with_max_depth(store: &'a S, max_depth: usize) -> Self {
        Self { store, max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Walk parent pointers from `level_id` towards the root.
    ///
    /// At most `max_depth` parent lookups are made. A missing row ends the
    /// walk normally; a revisited level or an exhausted hop cap ends it early
    /// and is reported through [`HierarchyPath::end`].
    pub async fn path(&self, scope: &ProjectScope, level_id: LevelId) -> Result<HierarchyPath, AuthzError> {
        let mut levels = vec![level_id];
        let mut visited = HashSet::from([level_id]);
        let mut current = level_id;

        for _ in 0..self.max_depth {
            let parent = match self.store.parent_of(scope, current).await? {
                Some(parent) => parent,
                None => {
                    return Ok(HierarchyPath {
                        levels,
                        end: PathEnd::MissingLevel(current),
                    })
                }
            };

            if parent == ROOT_PARENT {
                return Ok(HierarchyPath { levels, end: PathEnd::Root });
            }

            if !visited.insert(parent) {
                warn!(
                    "Cycle in functional levels of {}: level {} points back to {}",
                    scope, current, parent
                );
                return Ok(HierarchyPath {
                    levels,
                    end: PathEnd::Cycle(parent),
                });
            }

            levels.push(parent);
            current = parent;
        }

        warn!(
            "Functional level walk in {} from level {} stopped after {} hops",
            scope, level_id, self.max_depth
        );
        Ok(HierarchyPath {
            levels,
            end: PathEnd::DepthLimit,
        })
    }

    /// True when making `new_parent` the parent of `level_id` would close a loop
    pub async fn would_create_cycle(
        &self,
        scope: &ProjectScope,
        level_id: LevelId,
        new_parent: LevelId,
    ) -> Result<bool, AuthzError> {
        if new_parent == ROOT_PARENT {
            return Ok(false);
        }
        if new_parent == level_id {
            return Ok(true);
        }

        let path = self.path(scope, new_parent).await?;
        if path.contains(level_id) {
            return Ok(true);
        }

        // An already-corrupt chain above the new parent can't be vouched for
        match path.end {
            PathEnd::Cycle(at) => Err(AuthzError::HierarchyCycle { level_id: at }),
            PathEnd::DepthLimit => Err(AuthzError::HierarchyTooDeep {
                level_id: new_parent,
                max_depth: self.max_depth,
            }),
            PathEnd::Root | PathEnd::MissingLevel(_) => Ok(false),
        }
    }
}
