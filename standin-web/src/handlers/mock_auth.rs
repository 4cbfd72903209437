//! Mock login and logout
//!
//! Switches the mock identity by setting the override cookie, the way the
//! provider's login redirect would. Not available in provider mode.

use crate::{middleware::Caller, AppState, WebError};
use axum::{
    extract::{Path, Query, State},
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use standin_auth::{CallerContext, MockMode, SourceMode};
use tracing::info;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LoginQuery {
    /// Where to go after switching; same-origin paths only
    pub post_login_redirect_uri: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LogoutQuery {
    pub post_logout_redirect_uri: Option<String>,
}

/// Sign in as one of the fixed mock identities
#[utoipa::path(
    get,
    path = "/.auth/login/{mode}",
    tag = "Mock",
    summary = "Mock login",
    params(
        ("mode" = String, Path, description = "admin, user or anonymous"),
        LoginQuery
    ),
    responses(
        (status = 303, description = "Override cookie set, redirecting"),
        (status = 400, description = "Unknown mock mode"),
        (status = 404, description = "Provider mode is active")
    )
)]
pub async fn mock_login(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(mode): Path<String>,
    Query(query): Query<LoginQuery>,
) -> Result<Response, WebError> {
    ensure_mock(&caller)?;
    let mode: MockMode = mode.parse().map_err(WebError::BadRequest)?;

    info!(mock_mode = %mode, "Mock login");
    Ok(switch_mode(
        &state,
        mode,
        query.post_login_redirect_uri.as_deref(),
    ))
}

/// Return to the anonymous mock identity
#[utoipa::path(
    get,
    path = "/.auth/logout",
    tag = "Mock",
    summary = "Mock logout",
    params(LogoutQuery),
    responses(
        (status = 303, description = "Override cookie reset, redirecting"),
        (status = 404, description = "Provider mode is active")
    )
)]
pub async fn mock_logout(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Query(query): Query<LogoutQuery>,
) -> Result<Response, WebError> {
    ensure_mock(&caller)?;

    info!("Mock logout");
    Ok(switch_mode(
        &state,
        MockMode::Anonymous,
        query.post_logout_redirect_uri.as_deref(),
    ))
}

fn ensure_mock(caller: &CallerContext) -> Result<(), WebError> {
    match caller.mode {
        SourceMode::Mock => Ok(()),
        SourceMode::Provider => Err(WebError::NotFound(
            "mock login is not available".to_string(),
        )),
    }
}

fn switch_mode(state: &AppState, mode: MockMode, redirect: Option<&str>) -> Response {
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        state.auth.override_cookie(),
        mode.as_str()
    );
    (
        AppendHeaders([(SET_COOKIE, cookie)]),
        Redirect::to(safe_redirect(redirect)),
    )
        .into_response()
}

/// Same-origin absolute paths only; anything else goes to `/`.
fn safe_redirect(target: Option<&str>) -> &str {
    match target {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirects_stay_on_origin() {
        assert_eq!(safe_redirect(None), "/");
        assert_eq!(safe_redirect(Some("/dashboard?tab=1")), "/dashboard?tab=1");
        assert_eq!(safe_redirect(Some("https://evil.example")), "/");
        assert_eq!(safe_redirect(Some("//evil.example")), "/");
        assert_eq!(safe_redirect(Some("/\\evil.example")), "/");
    }
}
