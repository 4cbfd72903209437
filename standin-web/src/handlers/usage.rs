//! Usage handlers

use crate::{middleware::Caller, AppState, WebError};
use axum::{extract::State, response::Json};
use serde::Serialize;
use standin_auth::UsageSnapshot;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct UsageResponse {
    pub metered: bool,
    /// `null` for account holders
    pub usage: Option<UsageSnapshot>,
}

/// Caller's usage in the current daily window
#[utoipa::path(
    get,
    path = "/api/usage",
    tag = "Usage",
    summary = "Current usage",
    description = "Read-only; never consumes quota.",
    responses(
        (status = 200, description = "Usage for the caller's anonymous key", body = UsageResponse)
    )
)]
pub async fn get_usage(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<UsageResponse>, WebError> {
    let usage = match caller.anonymous_key() {
        Some(key) => Some(state.auth.usage().usage(&key).await?),
        None => None,
    };
    Ok(Json(UsageResponse {
        metered: usage.is_some(),
        usage,
    }))
}
