use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{auth, requests, responses, stats};

/// The full HTTP surface. Every route is reachable both at the root and
/// under `/api`. CORS is left to the binary since it depends on deployment.
pub fn router(state: AppState) -> Router {
    let api = api_routes(state);

    Router::new()
        .route("/health", get(stats::health))
        .merge(api.clone())
        .nest("/api", api)
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
}

fn api_routes(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/login", get(auth::begin_login))
        .route("/auth/profile", get(auth::complete_login))
        .route("/auth/set-session", post(auth::set_session))
        .route("/requests", get(requests::list_requests))
        .route("/requests/{id}", get(requests::get_request))
        .route("/stats", get(stats::stats))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/profile", put(auth::update_profile))
        .route("/auth/logout", post(auth::logout))
        .route("/requests", post(requests::create_request))
        .route("/requests/my", get(requests::my_requests))
        .route("/requests/{id}/status", put(requests::update_status))
        .route("/responses", post(responses::create_response))
        .route("/responses/my", get(responses::my_responses))
        .route("/responses/request/{id}", get(responses::request_responses))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}
