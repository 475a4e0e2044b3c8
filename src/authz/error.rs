use thiserror::Error;

use crate::database::manager::DatabaseError;
use crate::types::{LevelId, RequirementId};

/// Errors from the authorization core. A negative answer is never an error;
/// these cover caller mistakes, corrupt data and infrastructure failures.
#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("Both req_id ({req_id}) and level_id ({level_id}) were supplied; expected at most one")]
    AmbiguousScope { req_id: RequirementId, level_id: LevelId },

    #[error("Functional level hierarchy contains a cycle at level {level_id}")]
    HierarchyCycle { level_id: LevelId },

    #[error("Functional level hierarchy exceeds {max_depth} levels starting at level {level_id}")]
    HierarchyTooDeep { level_id: LevelId, max_depth: usize },

    #[error("Access level {0} is outside the range 1-9")]
    InvalidAccessLevel(i64),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for AuthzError {
    fn from(err: sqlx::Error) -> Self {
        AuthzError::Database(DatabaseError::Sqlx(err))
    }
}
