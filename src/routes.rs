use axum::{
    http::HeaderValue,
    middleware,
    routing::{delete, get, patch, post, put, MethodRouter},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::authz::api_names;
use crate::config;
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, validate_access, AccessGate};
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let settings = config::config();

    let mut router = Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        // Protected
        .merge(protected_routes(state));

    if settings.security.enable_cors {
        router = router.layer(cors_layer(&settings.security.cors_origins));
    }
    if settings.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router
}

fn protected_routes(state: AppState) -> Router {
    use protected::{access, approvals, levels};

    Router::new()
        // Functional levels
        .route(
            "/api/projects/:project_id/levels",
            get(levels::list).merge(gated(&state, api_names::CREATE_FUNCTIONAL_LEVEL, post(levels::create))),
        )
        .route(
            "/api/projects/:project_id/levels/:level_id",
            get(levels::get)
                .merge(gated(&state, api_names::UPDATE_FUNCTIONAL_LEVEL, patch(levels::update)))
                .merge(gated(&state, api_names::DELETE_FUNCTIONAL_LEVEL, delete(levels::delete))),
        )
        .route(
            "/api/projects/:project_id/levels/:level_id/parent",
            gated(&state, api_names::MOVE_FUNCTIONAL_LEVEL, put(levels::move_parent)),
        )
        .route("/api/projects/:project_id/levels/:level_id/path", get(levels::path))
        // Approver grants and approvals
        .route(
            "/api/projects/:project_id/approvers",
            get(approvals::list).merge(gated(&state, api_names::ADD_REQUIREMENT_APPROVER, post(approvals::add))),
        )
        .route(
            "/api/projects/:project_id/approvers/:user_id",
            gated(&state, api_names::DELETE_REQUIREMENT_APPROVER, delete(approvals::remove)),
        )
        .route(
            "/api/projects/:project_id/approvals",
            get(approvals::list_decisions).merge(gated(
                &state,
                api_names::UPDATE_REQUIREMENT_APPROVAL_STATUS,
                put(approvals::update_status),
            )),
        )
        .route("/api/projects/:project_id/approvals/check", get(approvals::check))
        // Access levels
        .route("/api/projects/:project_id/access/check", get(access::check))
        .route(
            "/api/access-levels",
            get(access::list).merge(gated(&state, api_names::UPDATE_ACCESS_LEVELS, put(access::upsert))),
        )
        .route(
            "/api/access-levels/level",
            gated(&state, api_names::UPDATE_ACCESS_LEVELS, patch(access::set_level)),
        )
        .route(
            "/api/users/:user_id/access-level",
            gated(&state, api_names::UPDATE_USER_ACCESS_LEVEL, put(access::set_user_level)),
        )
        .route_layer(middleware::from_fn(jwt_auth_middleware))
        .with_state(state)
}

/// Wrap a method router in `validate_access` for `api_name`
fn gated(state: &AppState, api_name: &'static str, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.route_layer(middleware::from_fn_with_state(
        AccessGate::new(state.clone(), api_name),
        validate_access,
    ))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}
