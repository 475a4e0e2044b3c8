use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::authz::PermissionVector;

/// Row of `account_access_levels`: which access levels hold one capability
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AccessLevelDefinition {
    pub corporate_account: String,
    pub category_header: String,
    pub category_sub_header: String,
    #[sqlx(try_from = "Vec<bool>")]
    pub level_grants: PermissionVector,
}

/// Row of `api_access_categories`: the capability an API endpoint requires
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ApiAccessCategory {
    pub api_name: String,
    pub category_header: String,
    pub category_sub_header: String,
}
