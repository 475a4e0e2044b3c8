// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Route Prefix: /api/*
// Middleware: jwt_auth_middleware on every route, validate_access on mutating routes

pub mod access;
pub mod approvals;
pub mod levels;

use crate::middleware::AuthUser;
use crate::types::ProjectScope;

/// Projects are always read inside the caller's own corporate account
pub(crate) fn project_scope(user: &AuthUser, project_id: String) -> ProjectScope {
    ProjectScope::new(user.corporate_account.clone(), project_id)
}
