//! Guest session handlers

use crate::{AppState, WebError};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use standin_auth::GuestSession;
use standin_core::redact_token;
use std::collections::HashMap;
use tracing::info;
use utoipa::ToSchema;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateGuestSessionRequest {
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GuestSessionResponse {
    pub session_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub metadata: HashMap<String, String>,
}

impl From<GuestSession> for GuestSessionResponse {
    fn from(session: GuestSession) -> Self {
        Self {
            session_id: session.session_id,
            created_at: session.created_at,
            expires_at: session.expires_at,
            metadata: session.metadata,
        }
    }
}

/// Issue a guest session
#[utoipa::path(
    post,
    path = "/api/guest/sessions",
    tag = "Guest",
    summary = "Create guest session",
    description = "The body is optional. Present the returned id in the guest session header on later requests.",
    request_body(content = CreateGuestSessionRequest, content_type = "application/json", description = "Optional"),
    responses(
        (status = 201, description = "Session created", body = GuestSessionResponse),
        (status = 400, description = "Malformed body")
    )
)]
pub async fn create_guest_session(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<GuestSessionResponse>), WebError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        CreateGuestSessionRequest::default()
    } else {
        serde_json::from_slice::<CreateGuestSessionRequest>(&body)
            .map_err(|e| WebError::BadRequest(format!("invalid guest session request: {e}")))?
    };

    let session = state.auth.sessions().create_session(request.metadata).await;
    info!(
        session = %redact_token(&session.session_id),
        "Guest session issued"
    );
    Ok((StatusCode::CREATED, Json(session.into())))
}

/// Look up a guest session
#[utoipa::path(
    get,
    path = "/api/guest/sessions/{session_id}",
    tag = "Guest",
    summary = "Get guest session",
    params(
        ("session_id" = String, Path, description = "Guest session id")
    ),
    responses(
        (status = 200, description = "Active session", body = GuestSessionResponse),
        (status = 404, description = "Unknown or expired session")
    )
)]
pub async fn get_guest_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<GuestSessionResponse>, WebError> {
    let session = state.auth.sessions().get_session(&session_id).await?;
    Ok(Json(session.into()))
}
