use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::project_scope;
use crate::authz::HierarchyPath;
use crate::database::models::{FunctionalLevel, LevelStatus};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::LevelService;
use crate::state::AppState;
use crate::types::LevelId;

#[derive(Debug, Deserialize)]
pub struct CreateLevelRequest {
    pub level_description: String,
    pub parent_level_id: Option<LevelId>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLevelRequest {
    pub level_description: Option<String>,
    pub status: Option<LevelStatus>,
}

#[derive(Debug, Deserialize)]
pub struct MoveLevelRequest {
    pub parent_level_id: LevelId,
}

/// GET /api/projects/:project_id/levels
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
) -> ApiResult<Vec<FunctionalLevel>> {
    let scope = project_scope(&user, project_id);
    let levels = LevelService::new(state.store.as_ref()).list_levels(&scope).await?;
    Ok(ApiResponse::success(levels))
}

/// POST /api/projects/:project_id/levels
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Json(body): Json<CreateLevelRequest>,
) -> ApiResult<FunctionalLevel> {
    let scope = project_scope(&user, project_id);
    let level = LevelService::new(state.store.as_ref())
        .create_level(&scope, &body.level_description, body.parent_level_id, Some(&user.user_id))
        .await?;
    Ok(ApiResponse::created(level))
}

/// GET /api/projects/:project_id/levels/:level_id
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, level_id)): Path<(String, LevelId)>,
) -> ApiResult<FunctionalLevel> {
    let scope = project_scope(&user, project_id);
    let level = LevelService::new(state.store.as_ref()).get_level(&scope, level_id).await?;
    Ok(ApiResponse::success(level))
}

/// PATCH /api/projects/:project_id/levels/:level_id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, level_id)): Path<(String, LevelId)>,
    Json(body): Json<UpdateLevelRequest>,
) -> ApiResult<FunctionalLevel> {
    let scope = project_scope(&user, project_id);
    let level = LevelService::new(state.store.as_ref())
        .update_level(&scope, level_id, body.level_description.as_deref(), body.status)
        .await?;
    Ok(ApiResponse::success(level))
}

/// PUT /api/projects/:project_id/levels/:level_id/parent
pub async fn move_parent(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, level_id)): Path<(String, LevelId)>,
    Json(body): Json<MoveLevelRequest>,
) -> ApiResult<FunctionalLevel> {
    let scope = project_scope(&user, project_id);
    let level = LevelService::new(state.store.as_ref())
        .move_level(&scope, level_id, body.parent_level_id)
        .await?;
    Ok(ApiResponse::success(level))
}

/// DELETE /api/projects/:project_id/levels/:level_id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, level_id)): Path<(String, LevelId)>,
) -> ApiResult<Value> {
    let scope = project_scope(&user, project_id);
    LevelService::new(state.store.as_ref()).delete_level(&scope, level_id).await?;
    Ok(ApiResponse::success(json!({ "level_id": level_id, "deleted": true })))
}

/// GET /api/projects/:project_id/levels/:level_id/path
pub async fn path(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, level_id)): Path<(String, LevelId)>,
) -> ApiResult<HierarchyPath> {
    let scope = project_scope(&user, project_id);
    let path = LevelService::new(state.store.as_ref()).level_path(&scope, level_id).await?;
    Ok(ApiResponse::success(path))
}
