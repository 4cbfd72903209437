//! Standin Web Server
//!
//! HTTP surface for the authentication emulation layer: provider-compatible
//! `/.auth` endpoints, mock login switching, guest sessions and the metered
//! invoke endpoint.

pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod state;

// Re-export main types
pub use middleware::{Caller, MOCK_MARKER_HEADER};
pub use server::{StandinServer, StandinServerBuilder};
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    http::{header::RETRY_AFTER, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    Router,
};
use standin_core::StandinError;
use tower_http::{
    cors::{AllowHeaders, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST])
        .allow_credentials(true)
        .allow_headers(AllowHeaders::mirror_request());

    Router::new()
        .nest("/api", routes::api_routes())
        .nest("/.auth", routes::auth_routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::caller_context,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .with_state(state)
}

/// Error types for the web server
#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error(transparent)]
    Auth(#[from] StandinError),

    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;

impl WebError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebError::Auth(error) => match error {
                StandinError::SessionNotFound { .. } => StatusCode::NOT_FOUND,
                StandinError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
                StandinError::CapabilityDenied { .. } => StatusCode::FORBIDDEN,
                StandinError::Validation { .. } | StandinError::IdentityMalformed { .. } => {
                    StatusCode::BAD_REQUEST
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            WebError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
            WebError::NotFound(_) => StatusCode::NOT_FOUND,
            WebError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            WebError::Auth(error) => match error {
                StandinError::SessionNotFound { .. } => "session_not_found",
                StandinError::QuotaExceeded { .. } => "quota_exceeded",
                StandinError::CapabilityDenied { .. } => "capability_denied",
                StandinError::Validation { .. } | StandinError::IdentityMalformed { .. } => {
                    "invalid_request"
                }
                _ => "internal_error",
            },
            WebError::Server(_) => "internal_error",
            WebError::NotFound(_) => "not_found",
            WebError::BadRequest(_) => "invalid_request",
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        match &self {
            WebError::Auth(error) => error.log(),
            WebError::Server(error) => tracing::error!(error = %error, "Server error"),
            _ => {}
        }

        // Internal details stay in the log
        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        match self {
            WebError::Auth(StandinError::QuotaExceeded {
                limit,
                remaining,
                resets_at,
                retry_after_secs,
                context,
                ..
            }) => {
                let mut response = (
                    status,
                    Json(serde_json::json!({
                        "error": code,
                        "message": message,
                        "limit": limit,
                        "remaining": remaining,
                        "resets_at": resets_at,
                        "suggestions": context.recovery_suggestions,
                    })),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs));
                response
            }
            WebError::Auth(StandinError::CapabilityDenied {
                capability, role, ..
            }) => (
                status,
                Json(serde_json::json!({
                    "error": code,
                    "message": message,
                    "capability": capability,
                    "role": role,
                })),
            )
                .into_response(),
            _ => (
                status,
                Json(serde_json::json!({
                    "error": code,
                    "message": message,
                })),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use standin_core::{session_not_found, ErrorContext};

    #[test]
    fn status_mapping() {
        let cases = [
            (WebError::from(session_not_found!("abc", "test")), StatusCode::NOT_FOUND),
            (
                WebError::from(StandinError::CapabilityDenied {
                    capability: "administer".to_string(),
                    role: "user".to_string(),
                    context: ErrorContext::new("test"),
                }),
                StatusCode::FORBIDDEN,
            ),
            (
                WebError::from(StandinError::Internal {
                    message: "boom".to_string(),
                    context: ErrorContext::new("test"),
                }),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (WebError::BadRequest("x".to_string()), StatusCode::BAD_REQUEST),
        ];
        for (error, expected) in cases {
            assert_eq!(error.status(), expected, "{error}");
        }
    }

    #[test]
    fn quota_response_carries_retry_after() {
        let error = WebError::from(StandinError::QuotaExceeded {
            used: 5,
            limit: 5,
            remaining: 0,
            resets_at: Utc::now() + Duration::hours(1),
            retry_after_secs: 3600,
            context: ErrorContext::new("test"),
        });
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "3600");
    }
}
