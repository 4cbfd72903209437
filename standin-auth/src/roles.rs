//! Role resolution
//!
//! Fallback chain, first match wins:
//! 1. highest-privilege role carried by the identity
//! 2. one call to the role-assignment directory for identified callers
//! 3. `Anonymous`
//!
//! The directory call is bounded by a timeout and never retried; any
//! failure counts as "no role returned".

use crate::identity::Identity;
use crate::role::{ResolvedVia, Role, RoleAssignment};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use standin_core::{with_timeout, ErrorContext, StandinConfig, StandinError, StandinResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// External role-assignment collaborator.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    /// Zero or one role name for `caller_id`.
    async fn fetch_role(&self, caller_id: &str) -> StandinResult<Option<String>>;
}

/// Used when no fallback endpoint is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRoleDirectory;

#[async_trait]
impl RoleDirectory for NoRoleDirectory {
    async fn fetch_role(&self, _caller_id: &str) -> StandinResult<Option<String>> {
        Ok(None)
    }
}

/// Fixed caller → role table.
#[derive(Debug, Default, Clone)]
pub struct StaticRoleDirectory {
    assignments: HashMap<String, String>,
}

impl StaticRoleDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assignment(mut self, caller_id: impl Into<String>, role: impl Into<String>) -> Self {
        self.assignments.insert(caller_id.into(), role.into());
        self
    }
}

#[async_trait]
impl RoleDirectory for StaticRoleDirectory {
    async fn fetch_role(&self, caller_id: &str) -> StandinResult<Option<String>> {
        Ok(self.assignments.get(caller_id).cloned())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RoleLookupRequest<'a> {
    caller_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct RoleLookupResponse {
    #[serde(default)]
    role: Option<String>,
}

/// Role directory behind an HTTP endpoint.
///
/// `POST {url}` with `{"callerId": "..."}`, expecting `{"role": "user"}` or
/// `{"role": null}`.
#[derive(Debug, Clone)]
pub struct HttpRoleDirectory {
    client: reqwest::Client,
    url: String,
}

impl HttpRoleDirectory {
    pub fn new(url: impl Into<String>, timeout: Duration) -> StandinResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StandinError::Config {
                message: format!("Failed to build role directory client: {e}"),
                source: Some(Box::new(e)),
                context: ErrorContext::new("roles").with_operation("build_client"),
            })?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

fn lookup_unavailable(message: String, source: Option<reqwest::Error>) -> StandinError {
    StandinError::RoleLookupUnavailable {
        message,
        source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        context: ErrorContext::new("roles").with_operation("fetch_role"),
    }
}

#[async_trait]
impl RoleDirectory for HttpRoleDirectory {
    async fn fetch_role(&self, caller_id: &str) -> StandinResult<Option<String>> {
        let response = self
            .client
            .post(&self.url)
            .json(&RoleLookupRequest { caller_id })
            .send()
            .await
            .map_err(|e| lookup_unavailable(format!("request to {} failed", self.url), Some(e)))?;

        if !response.status().is_success() {
            return Err(lookup_unavailable(
                format!("{} answered {}", self.url, response.status()),
                None,
            ));
        }

        let body: RoleLookupResponse = response
            .json()
            .await
            .map_err(|e| lookup_unavailable("unreadable role response".to_string(), Some(e)))?;
        Ok(body.role)
    }
}

pub struct RoleResolver {
    directory: Arc<dyn RoleDirectory>,
    timeout: Duration,
}

impl RoleResolver {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

    pub fn new(directory: Arc<dyn RoleDirectory>, timeout: Duration) -> Self {
        Self { directory, timeout }
    }

    /// HTTP directory when `roles.fallback_url` is set, otherwise none.
    pub fn from_config(config: &StandinConfig) -> StandinResult<Self> {
        let timeout = Duration::from_millis(config.roles.fallback_timeout_ms);
        let directory: Arc<dyn RoleDirectory> = match &config.roles.fallback_url {
            Some(url) => Arc::new(HttpRoleDirectory::new(url.clone(), timeout)?),
            None => Arc::new(NoRoleDirectory),
        };
        Ok(Self::new(directory, timeout))
    }

    pub async fn resolve_role(&self, identity: &Identity) -> RoleAssignment {
        if let Some(role) = identity.roles.iter().max() {
            return RoleAssignment::new(identity.caller_id.clone(), *role, ResolvedVia::Header);
        }

        let Some(caller_id) = identity.caller_id.as_deref() else {
            return RoleAssignment::anonymous_default(None);
        };

        match self.lookup(caller_id).await {
            Some(role) => {
                debug!(caller_id, role = %role, "Role resolved via fallback endpoint");
                RoleAssignment::new(Some(caller_id.to_string()), role, ResolvedVia::FallbackEndpoint)
            }
            None => RoleAssignment::anonymous_default(Some(caller_id.to_string())),
        }
    }

    async fn lookup(&self, caller_id: &str) -> Option<Role> {
        let outcome = with_timeout(
            self.directory.fetch_role(caller_id),
            self.timeout,
            "role_fallback",
        )
        .await
        .and_then(|inner| inner);

        match outcome {
            Ok(Some(name)) => {
                let role = Role::from_claim(&name);
                if role.is_none() {
                    warn!(caller_id, role = %name, "Fallback endpoint returned an unknown role");
                }
                role
            }
            Ok(None) => None,
            Err(error) => {
                let error = match error {
                    StandinError::Timeout { duration_ms, .. } => StandinError::RoleLookupUnavailable {
                        message: format!("no answer within {duration_ms}ms"),
                        source: None,
                        context: ErrorContext::new("roles").with_operation("fetch_role"),
                    },
                    other => other,
                };
                error.log();
                None
            }
        }
    }
}

impl std::fmt::Debug for RoleResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleResolver")
            .field("timeout", &self.timeout)
            .finish()
    }
}
