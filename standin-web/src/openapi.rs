//! OpenAPI specification for the standin web server

use axum::response::Json;
use utoipa::OpenApi;

use crate::handlers::{
    CallerResponse, CreateGuestSessionRequest, GuestSessionResponse, HealthResponse,
    InvokeRequest, InvokeResponse, ModelTier, PrincipalResponse, UsageResponse,
};
use standin_auth::{
    Capability, ClientPrincipal, GuestSession, Identity, MockMode, ResolvedVia, Role,
    RoleAssignment, SourceMode, UsageSnapshot,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Standin API",
        version = "0.1.0",
        description = "Local authentication emulation: mock and provider identities, roles, guest sessions and anonymous quotas",
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:4280", description = "Local development server")
    ),
    paths(
        crate::handlers::health_check,
        crate::handlers::auth_me,
        crate::handlers::caller_info,
        crate::handlers::mock_login,
        crate::handlers::mock_logout,
        crate::handlers::create_guest_session,
        crate::handlers::get_guest_session,
        crate::handlers::get_usage,
        crate::handlers::invoke,
    ),
    components(schemas(
        HealthResponse,
        PrincipalResponse,
        CallerResponse,
        CreateGuestSessionRequest,
        GuestSessionResponse,
        UsageResponse,
        InvokeRequest,
        InvokeResponse,
        ModelTier,
        ClientPrincipal,
        Identity,
        Role,
        RoleAssignment,
        ResolvedVia,
        SourceMode,
        MockMode,
        GuestSession,
        UsageSnapshot,
        Capability,
    )),
    tags(
        (name = "Health", description = "Service status"),
        (name = "Identity", description = "Who is calling"),
        (name = "Mock", description = "Mock identity switching, local only"),
        (name = "Guest", description = "Guest sessions"),
        (name = "Usage", description = "Anonymous quota"),
        (name = "Invoke", description = "Capability-gated, metered operations"),
    )
)]
pub struct ApiDoc;

/// Serve the OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/health",
            "/.auth/me",
            "/api/auth/me",
            "/.auth/login/{mode}",
            "/.auth/logout",
            "/api/guest/sessions",
            "/api/guest/sessions/{session_id}",
            "/api/usage",
            "/api/invoke",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
