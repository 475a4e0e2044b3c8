// handlers/public/mod.rs - Public handlers (no authentication)

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::manager::DatabaseManager;

/// GET / - service info
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "status": "Success",
        "data": {
            "name": "ReqHub API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Requirements management API: functional levels, approvals and access levels",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "levels": "/api/projects/:project_id/levels[/:level_id[/parent|/path]] (protected)",
                "approvers": "/api/projects/:project_id/approvers[/:user_id] (protected)",
                "approvals": "/api/projects/:project_id/approvals[/check] (protected)",
                "access": "/api/projects/:project_id/access/check, /api/access-levels[/level], /api/users/:user_id/access-level (protected)"
            }
        }
    }))
}

/// GET /health - database liveness
pub async fn health() -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "status": "Success",
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "status": "Failed",
                    "status_description": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
