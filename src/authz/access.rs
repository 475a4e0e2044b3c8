//! Numeric access levels and the category permission matrix.
//!
//! Every account defines, per (category header, sub-header) capability, which
//! of the nine access levels hold it. A user's effective level is the
//! project-specific override when one exists, else the account default, else
//! the configured fallback (1).

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

use super::error::AuthzError;
use super::store::AccessMatrixStore;
use crate::config;

/// Number of access tiers
pub const LEVEL_COUNT: usize = 9;

/// API names checked by `validate_access`, keyed into `api_access_categories`
pub mod api_names {
    pub const CREATE_FUNCTIONAL_LEVEL: &str = "create_functional_level";
    pub const UPDATE_FUNCTIONAL_LEVEL: &str = "update_functional_level";
    pub const MOVE_FUNCTIONAL_LEVEL: &str = "move_functional_level";
    pub const DELETE_FUNCTIONAL_LEVEL: &str = "delete_functional_level";
    pub const ADD_REQUIREMENT_APPROVER: &str = "add_requirement_approver";
    pub const DELETE_REQUIREMENT_APPROVER: &str = "delete_requirement_approver";
    pub const UPDATE_REQUIREMENT_APPROVAL_STATUS: &str = "update_requirement_approval_status";
    pub const UPDATE_ACCESS_LEVELS: &str = "update_access_levels";
    pub const UPDATE_USER_ACCESS_LEVEL: &str = "update_user_access_level";
}

/// A user's access tier, always within 1..=9
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct AccessLevel(u8);

impl AccessLevel {
    pub const LOWEST: AccessLevel = AccessLevel(1);
    pub const HIGHEST: AccessLevel = AccessLevel(LEVEL_COUNT as u8);

    pub fn new(level: u8) -> Option<Self> {
        if (1..=LEVEL_COUNT as u8).contains(&level) {
            Some(AccessLevel(level))
        } else {
            None
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    pub fn all() -> impl Iterator<Item = AccessLevel> {
        (1..=LEVEL_COUNT as u8).map(AccessLevel)
    }
}

impl TryFrom<i64> for AccessLevel {
    type Error = AuthzError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(AccessLevel::new)
            .ok_or(AuthzError::InvalidAccessLevel(value))
    }
}

impl From<AccessLevel> for i64 {
    fn from(level: AccessLevel) -> Self {
        level.0 as i64
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error)]
#[error("permission vector must have 9 entries, got {0}")]
pub struct InvalidPermissionVector(pub usize);

/// Which access levels hold a capability; slot `n - 1` is level `n`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<bool>", into = "Vec<bool>")]
pub struct PermissionVector([bool; LEVEL_COUNT]);

impl PermissionVector {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_levels(levels: impl IntoIterator<Item = AccessLevel>) -> Self {
        let mut vector = Self::none();
        for level in levels {
            vector.set(level, true);
        }
        vector
    }

    pub fn allows(&self, level: AccessLevel) -> bool {
        self.0[level.index()]
    }

    pub fn set(&mut self, level: AccessLevel, allowed: bool) {
        self.0[level.index()] = allowed;
    }

    pub fn allowed_levels(&self) -> Vec<AccessLevel> {
        AccessLevel::all().filter(|level| self.allows(*level)).collect()
    }
}

impl TryFrom<Vec<bool>> for PermissionVector {
    type Error = InvalidPermissionVector;

    fn try_from(value: Vec<bool>) -> Result<Self, Self::Error> {
        let slots: [bool; LEVEL_COUNT] = value
            .as_slice()
            .try_into()
            .map_err(|_| InvalidPermissionVector(value.len()))?;
        Ok(PermissionVector(slots))
    }
}

impl From<PermissionVector> for Vec<bool> {
    fn from(vector: PermissionVector) -> Self {
        vector.0.to_vec()
    }
}

/// Outcome of a matrix lookup, returned by the check endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    pub access_level: AccessLevel,
    pub category_header: String,
    pub category_sub_header: String,
    pub defined: bool,
    pub allowed: bool,
}

/// Resolves effective access levels and answers capability questions
pub struct AccessMatrix<'a, S: AccessMatrixStore + ?Sized> {
    store: &'a S,
    fallback_level: AccessLevel,
}

impl<'a, S: AccessMatrixStore + ?Sized> AccessMatrix<'a, S> {
    pub fn new(store: &'a S) -> Self {
        let fallback_level = AccessLevel::new(config::config().authorization.default_access_level)
            .unwrap_or(AccessLevel::LOWEST);
        Self { store, fallback_level }
    }

    pub fn with_fallback_level(store: &'a S, fallback_level: AccessLevel) -> Self {
        Self { store, fallback_level }
    }

    /// Project override, else account default, else the fallback level
    pub async fn effective_access_level(
        &self,
        account: &str,
        user_id: &str,
        project_id: Option<&str>,
    ) -> Result<AccessLevel, AuthzError> {
        if let Some(project_id) = project_id {
            if let Some(level) = self.store.project_access_level(account, user_id, project_id).await? {
                return AccessLevel::try_from(level as i64);
            }
        }

        match self.store.account_access_level(account, user_id).await? {
            Some(level) => AccessLevel::try_from(level as i64),
            None => Ok(self.fallback_level),
        }
    }

    pub async fn check(
        &self,
        account: &str,
        user_id: &str,
        project_id: Option<&str>,
        category_header: &str,
        category_sub_header: &str,
    ) -> Result<AccessDecision, AuthzError> {
        let access_level = self.effective_access_level(account, user_id, project_id).await?;
        let definition = self
            .store
            .definition(account, category_header, category_sub_header)
            .await?;

        let (defined, allowed) = match definition {
            Some(def) => (true, def.level_grants.allows(access_level)),
            None => (false, false),
        };

        debug!(
            "Access check {}/{} for user '{}' in '{}' at level {}: {}",
            category_header,
            category_sub_header,
            user_id,
            account,
            access_level,
            if allowed { "allowed" } else { "denied" }
        );

        Ok(AccessDecision {
            access_level,
            category_header: category_header.to_string(),
            category_sub_header: category_sub_header.to_string(),
            defined,
            allowed,
        })
    }

    pub async fn is_allowed(
        &self,
        account: &str,
        user_id: &str,
        project_id: Option<&str>,
        category_header: &str,
        category_sub_header: &str,
    ) -> Result<bool, AuthzError> {
        Ok(self
            .check(account, user_id, project_id, category_header, category_sub_header)
            .await?
            .allowed)
    }

    /// Same as [`AccessMatrix::is_allowed`] with the capability looked up by API name.
    /// An API name with no category mapping is denied.
    pub async fn is_api_allowed(
        &self,
        account: &str,
        user_id: &str,
        project_id: Option<&str>,
        api_name: &str,
    ) -> Result<bool, AuthzError> {
        let Some(category) = self.store.api_category(api_name).await? else {
            warn!("No access category mapped for API '{}'", api_name);
            return Ok(false);
        };

        self.is_allowed(
            account,
            user_id,
            project_id,
            &category.category_header,
            &category.category_sub_header,
        )
        .await
    }
}
