use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::authz::{AccessDecision, AccessLevel, PermissionVector};
use crate::database::models::{AccessLevelDefinition, ApiAccessCategory};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::AccessService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AccessCheckQuery {
    pub category: String,
    pub sub_category: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DefinitionRequest {
    pub category_header: String,
    pub category_sub_header: String,
    pub level_grants: PermissionVector,
}

#[derive(Debug, Deserialize)]
pub struct LevelPermissionRequest {
    pub category_header: String,
    pub category_sub_header: String,
    pub access_level: AccessLevel,
    pub allowed: bool,
}

#[derive(Debug, Deserialize)]
pub struct UserAccessLevelRequest {
    pub access_level: AccessLevel,
    pub project_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccessLevelsOverview {
    pub definitions: Vec<AccessLevelDefinition>,
    pub api_categories: Vec<ApiAccessCategory>,
}

/// GET /api/projects/:project_id/access/check?category=&sub_category=
pub async fn check(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Query(query): Query<AccessCheckQuery>,
) -> ApiResult<AccessDecision> {
    let user_id = query.user_id.unwrap_or_else(|| user.user_id.clone());
    let decision = AccessService::new(state.store.as_ref())
        .check(
            &user.corporate_account,
            &user_id,
            Some(&project_id),
            &query.category,
            &query.sub_category,
        )
        .await?;
    Ok(ApiResponse::success(decision))
}

/// GET /api/access-levels
pub async fn list(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<AccessLevelsOverview> {
    let service = AccessService::new(state.store.as_ref());
    let definitions = service.list_definitions(&user.corporate_account).await?;
    let api_categories = service.list_api_categories().await?;
    Ok(ApiResponse::success(AccessLevelsOverview {
        definitions,
        api_categories,
    }))
}

/// PUT /api/access-levels
pub async fn upsert(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<DefinitionRequest>,
) -> ApiResult<AccessLevelDefinition> {
    let definition = AccessService::new(state.store.as_ref())
        .upsert_definition(
            &user.corporate_account,
            &body.category_header,
            &body.category_sub_header,
            body.level_grants,
        )
        .await?;
    Ok(ApiResponse::success(definition))
}

/// PATCH /api/access-levels/level
pub async fn set_level(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<LevelPermissionRequest>,
) -> ApiResult<AccessLevelDefinition> {
    let definition = AccessService::new(state.store.as_ref())
        .set_level_permission(
            &user.corporate_account,
            &body.category_header,
            &body.category_sub_header,
            body.access_level,
            body.allowed,
        )
        .await?;
    Ok(ApiResponse::success(definition))
}

/// PUT /api/users/:user_id/access-level
pub async fn set_user_level(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(target_user): Path<String>,
    Json(body): Json<UserAccessLevelRequest>,
) -> ApiResult<Value> {
    AccessService::new(state.store.as_ref())
        .set_user_access_level(
            &user.corporate_account,
            &target_user,
            body.project_id.as_deref(),
            body.access_level,
        )
        .await?;
    Ok(ApiResponse::success(json!({
        "user_id": target_user,
        "project_id": body.project_id,
        "access_level": body.access_level
    })))
}
