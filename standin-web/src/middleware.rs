//! Caller resolution middleware
//!
//! Resolves the [`CallerContext`] once per request and hands it to handlers
//! through request extensions.

use crate::{AppState, WebError};
use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{header::COOKIE, request::Parts, HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use standin_auth::{CallerContext, RequestContext, SourceMode};
use standin_core::{ErrorContext, StandinError};
use std::net::SocketAddr;

/// Present on every response served by the mock identity source.
pub const MOCK_MARKER_HEADER: &str = "x-standin-mock";

/// Copy what the auth flow needs out of the HTTP request.
pub fn request_context(
    headers: &HeaderMap,
    uri_host: Option<&str>,
    peer: Option<SocketAddr>,
) -> RequestContext {
    let mut ctx = RequestContext::new();

    for name in headers.keys() {
        let values: Vec<&str> = headers
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();
        if values.is_empty() {
            continue;
        }
        let separator = if *name == COOKIE { "; " } else { ", " };
        ctx = ctx.with_header(name.as_str(), values.join(separator));
    }

    if let Some(host) = uri_host {
        ctx = ctx.with_host(host);
    }
    if let Some(peer) = peer {
        ctx = ctx.with_peer_addr(peer.ip());
    }
    ctx
}

pub async fn caller_context(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ctx = request_context(request.headers(), request.uri().host(), peer);

    let caller = state.auth.resolve_caller(&ctx).await;
    let mode = caller.mode;
    let mock_mode = caller.mock_mode;
    request.extensions_mut().insert(caller);

    let mut response = next.run(request).await;

    match (mode, mock_mode) {
        (SourceMode::Mock, Some(mock_mode)) => {
            response.headers_mut().insert(
                HeaderName::from_static(MOCK_MARKER_HEADER),
                HeaderValue::from_static(mock_mode.as_str()),
            );
        }
        (SourceMode::Provider, _) => {
            assert!(
                !response.headers().contains_key(MOCK_MARKER_HEADER),
                "mock marker emitted in provider mode"
            );
        }
        (SourceMode::Mock, None) => {}
    }
    response
}

/// Extractor for the caller resolved by [`caller_context`].
#[derive(Debug, Clone)]
pub struct Caller(pub CallerContext);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerContext>()
            .cloned()
            .map(Caller)
            .ok_or_else(|| {
                WebError::Auth(StandinError::Internal {
                    message: "caller context missing; is the middleware installed?".to_string(),
                    context: ErrorContext::new("web").with_operation("extract_caller"),
                })
            })
    }
}
