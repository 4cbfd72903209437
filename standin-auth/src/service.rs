//! Auth service facade
//!
//! Wires the environment switch, both identity sources, the role resolver,
//! guest sessions and the usage limiter into one per-request entry point.

use crate::context::CallerContext;
use crate::environment::{EnvironmentSwitch, RuntimeSignals, SourceMode};
use crate::identity::{IdentityAdapter, IdentitySource, MockIdentitySource, ProviderIdentitySource};
use crate::request::RequestContext;
use crate::roles::{HttpRoleDirectory, NoRoleDirectory, RoleDirectory, RoleResolver};
use crate::session::{GuestSession, GuestSessionManager, GuestSessionStore, MemorySessionStore, SessionLookup};
use crate::usage::{AnonymousUsageLimiter, MemoryUsageStore, UsageStore};
use standin_core::{redact_token, Clock, StandinConfig, StandinResult, SystemClock};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub struct AuthService {
    switch: EnvironmentSwitch,
    base_signals: RuntimeSignals,
    mock: MockIdentitySource,
    provider: ProviderIdentitySource,
    roles: RoleResolver,
    sessions: GuestSessionManager,
    usage: AnonymousUsageLimiter,
    clock: Arc<dyn Clock>,
    session_header: String,
    override_cookie: String,
    trusted_proxies: Vec<IpAddr>,
}

impl AuthService {
    pub fn builder(config: StandinConfig) -> AuthServiceBuilder {
        AuthServiceBuilder::new(config)
    }

    /// Service with in-memory stores and the wall clock.
    pub fn from_config(config: &StandinConfig) -> StandinResult<Self> {
        AuthServiceBuilder::new(config.clone()).build()
    }

    /// Which identity source serves a request.
    pub fn select_mode(&self, request: &RequestContext) -> SourceMode {
        let signals = RuntimeSignals {
            host: request.host().map(str::to_string),
            ..self.base_signals.clone()
        };
        self.switch.select_mode(&signals)
    }

    pub async fn resolve_caller(&self, request: &RequestContext) -> CallerContext {
        let mode = self.select_mode(request);
        let adapter = match mode {
            SourceMode::Mock => IdentityAdapter::Mock(&self.mock),
            SourceMode::Provider => IdentityAdapter::Provider(&self.provider),
        };
        let identity = adapter.resolve_identity(request);
        let mock_mode = match mode {
            SourceMode::Mock => Some(self.mock.mock_mode(request).0),
            SourceMode::Provider => None,
        };

        let assignment = self.roles.resolve_role(&identity).await;
        let guest_session = if identity.is_anonymous() {
            self.presented_session(request).await
        } else {
            None
        };

        let caller = CallerContext {
            identity,
            assignment,
            guest_session,
            mode,
            mock_mode,
            client_address: request.client_address_behind(&self.trusted_proxies),
        };
        debug!(
            mode = %caller.mode,
            caller_id = ?caller.assignment.caller_id,
            role = %caller.effective_role(),
            resolved_via = %caller.assignment.resolved_via,
            "Resolved caller"
        );
        caller
    }

    /// Active guest session named by the session header, if any. Unknown and
    /// expired ids are ignored and the caller stays plain anonymous.
    async fn presented_session(&self, request: &RequestContext) -> Option<GuestSession> {
        let session_id = request.header(&self.session_header)?.trim();
        if session_id.is_empty() {
            return None;
        }
        match self.sessions.lookup(session_id).await {
            SessionLookup::Active(session) => Some(session),
            outcome => {
                debug!(
                    session = %redact_token(session_id),
                    outcome = outcome.label(),
                    "Ignoring guest session header"
                );
                None
            }
        }
    }

    pub fn environment(&self) -> &EnvironmentSwitch {
        &self.switch
    }

    pub fn roles(&self) -> &RoleResolver {
        &self.roles
    }

    pub fn sessions(&self) -> &GuestSessionManager {
        &self.sessions
    }

    pub fn usage(&self) -> &AnonymousUsageLimiter {
        &self.usage
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn session_header(&self) -> &str {
        &self.session_header
    }

    pub fn override_cookie(&self) -> &str {
        &self.override_cookie
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("switch", &self.switch)
            .field("base_signals", &self.base_signals)
            .field("roles", &self.roles)
            .field("sessions", &self.sessions)
            .field("usage", &self.usage)
            .finish()
    }
}

/// Builder for [`AuthService`]; anything not injected comes from the config.
pub struct AuthServiceBuilder {
    config: StandinConfig,
    clock: Option<Arc<dyn Clock>>,
    role_directory: Option<Arc<dyn RoleDirectory>>,
    session_store: Option<Arc<dyn GuestSessionStore>>,
    usage_store: Option<Arc<dyn UsageStore>>,
}

impl AuthServiceBuilder {
    pub fn new(config: StandinConfig) -> Self {
        Self {
            config,
            clock: None,
            role_directory: None,
            session_store: None,
            usage_store: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_role_directory(mut self, directory: Arc<dyn RoleDirectory>) -> Self {
        self.role_directory = Some(directory);
        self
    }

    pub fn with_session_store(mut self, store: Arc<dyn GuestSessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    pub fn with_usage_store(mut self, store: Arc<dyn UsageStore>) -> Self {
        self.usage_store = Some(store);
        self
    }

    pub fn build(self) -> StandinResult<AuthService> {
        let config = self.config;
        config.validate()?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let timeout = Duration::from_millis(config.roles.fallback_timeout_ms);
        let directory = match self.role_directory {
            Some(directory) => directory,
            None => match &config.roles.fallback_url {
                Some(url) => Arc::new(HttpRoleDirectory::new(url.clone(), timeout)?) as Arc<dyn RoleDirectory>,
                None => Arc::new(NoRoleDirectory),
            },
        };
        let session_store = self
            .session_store
            .unwrap_or_else(|| Arc::new(MemorySessionStore::new()));
        let usage_store = self
            .usage_store
            .unwrap_or_else(|| Arc::new(MemoryUsageStore::new()));

        let service = AuthService {
            switch: EnvironmentSwitch::from_config(&config)?,
            base_signals: EnvironmentSwitch::signals(&config, None),
            mock: MockIdentitySource::from_config(&config),
            provider: ProviderIdentitySource::from_config(&config),
            roles: RoleResolver::new(directory, timeout),
            sessions: GuestSessionManager::from_config(&config, session_store, clock.clone()),
            usage: AnonymousUsageLimiter::from_config(&config, usage_store, clock.clone()),
            clock,
            session_header: config.guest.session_header.clone(),
            override_cookie: config.mock.override_cookie.clone(),
            trusted_proxies: config
                .server
                .trusted_proxies
                .iter()
                .filter_map(|proxy| proxy.trim().parse().ok())
                .collect(),
        };

        info!(
            production_hosts = config.environment.production_hosts.len(),
            dev_mode = config.server.dev_mode,
            daily_limit = config.usage.daily_limit,
            guest_ttl_hours = config.guest.ttl_hours,
            "Auth service initialized"
        );
        Ok(service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{ClientPrincipal, MockMode};
    use crate::role::{ResolvedVia, Role};
    use crate::roles::StaticRoleDirectory;
    use std::collections::HashMap;

    fn config() -> StandinConfig {
        let mut config = StandinConfig::default();
        config.environment.production_hosts = vec!["*.example.net".to_string()];
        config.server.dev_mode = true;
        config
    }

    #[tokio::test]
    async fn local_request_uses_mock_override() {
        let service = AuthService::from_config(&config()).unwrap();
        let request = RequestContext::new()
            .with_host("localhost:4280")
            .with_header("x-standin-mock-mode", "admin");

        let caller = service.resolve_caller(&request).await;
        assert_eq!(caller.mode, SourceMode::Mock);
        assert_eq!(caller.mock_mode, Some(MockMode::Admin));
        assert_eq!(caller.effective_role(), Role::Admin);
        assert_eq!(caller.assignment.resolved_via, ResolvedVia::Header);
    }

    #[tokio::test]
    async fn deployed_process_ignores_spoofed_local_host() {
        let mut config = StandinConfig::default();
        config.environment.production_hosts = vec!["*.example.net".to_string()];
        let service = AuthService::from_config(&config).unwrap();

        let spoofed = RequestContext::new()
            .with_host("localhost")
            .with_header("x-standin-mock-mode", "admin");
        let hostless = RequestContext::new().with_header("x-standin-mock-mode", "admin");

        for request in [spoofed, hostless] {
            let caller = service.resolve_caller(&request).await;
            assert_eq!(caller.mode, SourceMode::Provider);
            assert_eq!(caller.mock_mode, None);
            assert!(caller.identity.is_anonymous());
            assert_eq!(caller.effective_role(), Role::Anonymous);
        }
    }

    #[tokio::test]
    async fn production_request_ignores_mock_override() {
        let service = AuthService::from_config(&config()).unwrap();
        let request = RequestContext::new()
            .with_host("green-wave.example.net")
            .with_header("x-standin-mock-mode", "admin");

        let caller = service.resolve_caller(&request).await;
        assert_eq!(caller.mode, SourceMode::Provider);
        assert_eq!(caller.mock_mode, None);
        assert!(caller.identity.is_anonymous());
        assert_eq!(caller.effective_role(), Role::Anonymous);
    }

    #[tokio::test]
    async fn provider_caller_without_roles_uses_directory() {
        let directory = StaticRoleDirectory::new().with_assignment("u-7", "user");
        let service = AuthService::builder(config())
            .with_role_directory(Arc::new(directory))
            .build()
            .unwrap();
        let principal = ClientPrincipal {
            identity_provider: "aad".to_string(),
            user_id: "u-7".to_string(),
            user_details: "u7@example.net".to_string(),
            user_roles: vec![],
        };
        let request = RequestContext::new()
            .with_host("app.example.net")
            .with_header("x-ms-client-principal", principal.encode().unwrap());

        let caller = service.resolve_caller(&request).await;
        assert_eq!(caller.assignment.role, Role::User);
        assert_eq!(caller.assignment.resolved_via, ResolvedVia::FallbackEndpoint);
        assert_eq!(caller.anonymous_key(), None);
    }

    #[tokio::test]
    async fn guest_header_attaches_active_session() {
        let service = AuthService::from_config(&config()).unwrap();
        let session = service.sessions().create_session(HashMap::new()).await;

        let request = RequestContext::new()
            .with_host("localhost")
            .with_header("x-guest-session", session.session_id.clone());
        let caller = service.resolve_caller(&request).await;
        assert_eq!(caller.guest_session.as_ref(), Some(&session));
        assert_eq!(caller.effective_role(), Role::Guest);

        let request = RequestContext::new()
            .with_host("localhost")
            .with_header("x-guest-session", "forged");
        let caller = service.resolve_caller(&request).await;
        assert!(caller.guest_session.is_none());
        assert_eq!(caller.effective_role(), Role::Anonymous);
    }

    #[tokio::test]
    async fn forwarded_for_from_untrusted_peer_is_ignored() {
        let mut config = config();
        config.server.trusted_proxies = vec!["10.0.0.9".to_string()];
        let service = AuthService::from_config(&config).unwrap();

        let direct = RequestContext::new()
            .with_host("localhost")
            .with_peer_addr("198.51.100.2".parse().unwrap())
            .with_header("x-forwarded-for", "203.0.113.99");
        let caller = service.resolve_caller(&direct).await;
        assert_eq!(caller.anonymous_key().as_deref(), Some("ip:198.51.100.2"));

        let proxied = RequestContext::new()
            .with_host("localhost")
            .with_peer_addr("10.0.0.9".parse().unwrap())
            .with_header("x-forwarded-for", "203.0.113.99");
        let caller = service.resolve_caller(&proxied).await;
        assert_eq!(caller.anonymous_key().as_deref(), Some("ip:203.0.113.99"));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = config();
        config.usage.daily_limit = 0;
        assert!(AuthService::from_config(&config).is_err());
    }
}
