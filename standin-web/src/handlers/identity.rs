//! Identity handlers

use crate::middleware::Caller;
use axum::response::Json;
use serde::Serialize;
use standin_auth::{ClientPrincipal, GuestSession, Identity, MockMode, Role, RoleAssignment, SourceMode};
use utoipa::ToSchema;

/// Provider-compatible principal envelope.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalResponse {
    pub client_principal: Option<ClientPrincipal>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CallerResponse {
    pub identity: Identity,
    pub role: RoleAssignment,
    /// Role after guest-session promotion
    pub effective_role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_session: Option<GuestSession>,
    pub mode: SourceMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mock_mode: Option<MockMode>,
}

/// Current principal in the identity provider's shape
#[utoipa::path(
    get,
    path = "/.auth/me",
    tag = "Identity",
    summary = "Client principal",
    description = "Same shape for mock and provider identities; `null` for anonymous callers.",
    responses(
        (status = 200, description = "Principal envelope", body = PrincipalResponse)
    )
)]
pub async fn auth_me(Caller(caller): Caller) -> Json<PrincipalResponse> {
    Json(PrincipalResponse {
        client_principal: caller.identity.to_principal(),
    })
}

/// Canonical identity, role and guest session of the caller
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Identity",
    summary = "Resolved caller",
    responses(
        (status = 200, description = "Resolved caller", body = CallerResponse)
    )
)]
pub async fn caller_info(Caller(caller): Caller) -> Json<CallerResponse> {
    let effective_role = caller.effective_role();
    Json(CallerResponse {
        identity: caller.identity,
        role: caller.assignment,
        effective_role,
        guest_session: caller.guest_session,
        mode: caller.mode,
        mock_mode: caller.mock_mode,
    })
}
