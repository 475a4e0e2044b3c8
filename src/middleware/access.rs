use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
    Extension,
};
use std::collections::HashMap;
use tracing::warn;

use super::auth::AuthUser;
use crate::authz::AccessMatrix;
use crate::error::ApiError;
use crate::state::AppState;

/// State for one `validate_access` layer: the API name it guards
#[derive(Clone)]
pub struct AccessGate {
    pub state: AppState,
    pub api_name: &'static str,
}

impl AccessGate {
    pub fn new(state: AppState, api_name: &'static str) -> Self {
        Self { state, api_name }
    }
}

/// Rejects the request with 403 unless the caller's access level holds the
/// capability mapped to the gate's API name. Runs after `jwt_auth_middleware`.
pub async fn validate_access(
    State(gate): State<AccessGate>,
    Extension(user): Extension<AuthUser>,
    params: Option<Path<HashMap<String, String>>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let project_id = params.as_ref().and_then(|Path(params)| params.get("project_id").cloned());

    let matrix = AccessMatrix::new(gate.state.store.as_ref());
    let allowed = matrix
        .is_api_allowed(&user.corporate_account, &user.user_id, project_id.as_deref(), gate.api_name)
        .await?;

    if !allowed {
        warn!(
            "Access denied: user '{}' in '{}' calling {}",
            user.user_id, user.corporate_account, gate.api_name
        );
        return Err(ApiError::forbidden(format!(
            "User '{}' does not have access to {}",
            user.user_id, gate.api_name
        )));
    }

    Ok(next.run(request).await)
}
