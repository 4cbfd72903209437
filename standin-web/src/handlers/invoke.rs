//! Metered invoke handler

use crate::{middleware::Caller, AppState, WebError};
use axum::{extract::State, response::Json, Json as JsonExtractor};
use serde::{Deserialize, Serialize};
use standin_auth::{Capability, Role, UsageSnapshot};
use tracing::info;
use utoipa::ToSchema;

/// Cost per accepted invocation.
const INVOKE_COST: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Basic,
    Advanced,
}

impl ModelTier {
    pub fn capability(&self) -> Capability {
        match self {
            ModelTier::Basic => Capability::InvokeBasicModel,
            ModelTier::Advanced => Capability::InvokeAdvancedModel,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InvokeRequest {
    pub tier: ModelTier,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InvokeResponse {
    pub accepted: bool,
    pub tier: ModelTier,
    pub role: Role,
    /// Present for metered callers
    pub usage: Option<UsageSnapshot>,
}

/// Invoke a model tier
#[utoipa::path(
    post,
    path = "/api/invoke",
    tag = "Invoke",
    summary = "Metered invocation",
    description = "Checks the tier capability, then charges anonymous and guest callers one unit of their daily quota.",
    request_body = InvokeRequest,
    responses(
        (status = 200, description = "Invocation accepted", body = InvokeResponse),
        (status = 403, description = "Role lacks the tier capability"),
        (status = 429, description = "Daily anonymous quota exhausted")
    )
)]
pub async fn invoke(
    State(state): State<AppState>,
    Caller(caller): Caller,
    JsonExtractor(request): JsonExtractor<InvokeRequest>,
) -> Result<Json<InvokeResponse>, WebError> {
    caller.require(request.tier.capability())?;

    let usage = match caller.anonymous_key() {
        Some(key) => Some(state.auth.usage().consume(&key, INVOKE_COST).await?),
        None => None,
    };

    let role = caller.effective_role();
    info!(
        role = %role,
        tier = ?request.tier,
        remaining = usage.as_ref().map(|u| u.remaining),
        "Invocation accepted"
    );
    Ok(Json(InvokeResponse {
        accepted: true,
        tier: request.tier,
        role,
        usage,
    }))
}
