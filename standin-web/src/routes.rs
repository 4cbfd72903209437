//! Route definitions for the standin web server

use crate::{handlers, openapi, AppState};
use axum::{
    routing::{get, post},
    Router,
};

/// Routes mounted under `/api`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(openapi::openapi_json))
        .route("/auth/me", get(handlers::caller_info))
        .route("/usage", get(handlers::get_usage))
        .route("/invoke", post(handlers::invoke))
        .route("/guest/sessions", post(handlers::create_guest_session))
        .route(
            "/guest/sessions/{session_id}",
            get(handlers::get_guest_session),
        )
}

/// Provider-compatible routes mounted under `/.auth`
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(handlers::auth_me))
        .route("/login/{mode}", get(handlers::mock_login))
        .route("/logout", get(handlers::mock_logout))
}
