use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::project_scope;
use crate::authz::AuthScope;
use crate::database::models::{ApprovalDecision, ApprovalStatus, ApproverGrant, DecisionRecord};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{ApprovalService, AuthorizationCheck};
use crate::state::AppState;
use crate::types::{LevelId, RequirementId};

#[derive(Debug, Deserialize)]
pub struct ListApproversQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddApproverRequest {
    pub user_id: String,
    pub req_id: Option<RequirementId>,
    pub level_id: Option<LevelId>,
}

/// Target of a grant or decision given as the legacy id pair
#[derive(Debug, Default, Deserialize)]
pub struct TargetQuery {
    pub req_id: Option<RequirementId>,
    pub level_id: Option<LevelId>,
}

#[derive(Debug, Deserialize)]
pub struct ApprovalStatusRequest {
    pub req_id: Option<RequirementId>,
    pub level_id: Option<LevelId>,
    pub approval_status: ApprovalStatus,
    pub approver_comments: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    pub user_id: Option<String>,
    pub req_id: Option<RequirementId>,
    pub level_id: Option<LevelId>,
}

/// GET /api/projects/:project_id/approvers
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Query(query): Query<ListApproversQuery>,
) -> ApiResult<Vec<ApproverGrant>> {
    let scope = project_scope(&user, project_id);
    let grants = ApprovalService::new(state.store.as_ref())
        .list_grants(&scope, query.user_id.as_deref())
        .await?;
    Ok(ApiResponse::success(grants))
}

/// POST /api/projects/:project_id/approvers
pub async fn add(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Json(body): Json<AddApproverRequest>,
) -> ApiResult<ApproverGrant> {
    let scope = project_scope(&user, project_id);
    let target = AuthScope::from_ids(body.req_id, body.level_id)?;
    let grant = ApprovalService::new(state.store.as_ref())
        .add_grant(&scope, &body.user_id, target)
        .await?;
    Ok(ApiResponse::created(grant))
}

/// DELETE /api/projects/:project_id/approvers/:user_id?req_id=&level_id=
pub async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, approver_id)): Path<(String, String)>,
    Query(query): Query<TargetQuery>,
) -> ApiResult<Value> {
    let scope = project_scope(&user, project_id);
    let target = AuthScope::from_ids(query.req_id, query.level_id)?;
    ApprovalService::new(state.store.as_ref())
        .remove_grant(&scope, &approver_id, target)
        .await?;
    Ok(ApiResponse::success(json!({
        "user_id": approver_id,
        "target": target,
        "deleted": true
    })))
}

/// GET /api/projects/:project_id/approvals?req_id=&level_id=
pub async fn list_decisions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Query(query): Query<TargetQuery>,
) -> ApiResult<Vec<DecisionRecord>> {
    let scope = project_scope(&user, project_id);
    let target = AuthScope::from_ids(query.req_id, query.level_id)?;
    let decisions = ApprovalService::new(state.store.as_ref())
        .list_decisions(&scope, target)
        .await?;
    Ok(ApiResponse::success(decisions))
}

/// PUT /api/projects/:project_id/approvals
///
/// Records the caller's decision. A caller without approval authority over the
/// target gets 403 and nothing is written.
pub async fn update_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Json(body): Json<ApprovalStatusRequest>,
) -> ApiResult<DecisionRecord> {
    let scope = project_scope(&user, project_id);
    let decision = ApprovalDecision {
        target: AuthScope::from_ids(body.req_id, body.level_id)?,
        approval_user_id: user.user_id.clone(),
        approval_status: body.approval_status,
        approver_comments: body.approver_comments,
    };

    let record = ApprovalService::new(state.store.as_ref())
        .update_approval_status(&scope, decision)
        .await?;
    Ok(ApiResponse::success(record))
}

/// GET /api/projects/:project_id/approvals/check?user_id=&req_id=&level_id=
pub async fn check(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Query(query): Query<CheckQuery>,
) -> ApiResult<AuthorizationCheck> {
    let scope = project_scope(&user, project_id);
    let target = AuthScope::from_ids(query.req_id, query.level_id)?;
    let user_id = match query.user_id.as_deref().map(str::trim) {
        Some("") => return Err(ApiError::bad_request("user_id must not be empty")),
        Some(id) => id.to_string(),
        None => user.user_id.clone(),
    };

    let result = ApprovalService::new(state.store.as_ref())
        .check(&scope, &user_id, target)
        .await?;
    Ok(ApiResponse::success(result))
}
