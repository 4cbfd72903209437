//! Identity source adapters
//!
//! Normalizes "who is calling" into one [`Identity`] shape, whether the data
//! comes from the local mock or from the claims the real provider attached
//! to the request. Two sources implement the same [`IdentitySource`]
//! contract and are wrapped in [`IdentityAdapter`] for per-request selection.

use crate::environment::SourceMode;
use crate::overrides::{MockModeResolver, OverrideOrigin};
use crate::request::RequestContext;
use crate::role::Role;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use standin_core::{ErrorContext, StandinConfig, StandinError, StandinResult};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Upper bound on the encoded principal header.
const MAX_PRINCIPAL_BYTES: usize = 16 * 1024;

/// Name reported as `identityProvider` for mock principals.
pub const MOCK_PROVIDER_NAME: &str = "mock";

/// Canonical caller identity, recomputed for every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Identity {
    pub caller_id: Option<String>,
    pub email: Option<String>,
    pub roles: BTreeSet<Role>,
    pub source: SourceMode,
    /// Name of the upstream login provider, when known
    pub identity_provider: Option<String>,
}

impl Identity {
    pub fn anonymous(source: SourceMode) -> Self {
        Self {
            caller_id: None,
            email: None,
            roles: BTreeSet::new(),
            source,
            identity_provider: None,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.caller_id.is_none()
    }

    /// Provider wire shape, `None` for anonymous callers.
    pub fn to_principal(&self) -> Option<ClientPrincipal> {
        let user_id = self.caller_id.clone()?;
        Some(ClientPrincipal {
            identity_provider: self
                .identity_provider
                .clone()
                .unwrap_or_else(|| MOCK_PROVIDER_NAME.to_string()),
            user_details: self.email.clone().unwrap_or_else(|| user_id.clone()),
            user_id,
            user_roles: self.roles.iter().map(|r| r.as_str().to_string()).collect(),
        })
    }
}

/// Client principal as attached by the identity provider (base64 JSON in a
/// request header) and as returned from `/.auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ClientPrincipal {
    pub identity_provider: String,
    pub user_id: String,
    pub user_details: String,
    #[serde(default)]
    pub user_roles: Vec<String>,
}

impl ClientPrincipal {
    /// Decode the header value. Any failure is `IdentityMalformed`.
    pub fn decode(encoded: &str) -> StandinResult<Self> {
        if encoded.len() > MAX_PRINCIPAL_BYTES {
            return Err(malformed("principal header exceeds size limit"));
        }
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| malformed(&format!("invalid base64: {e}")))?;
        let principal: ClientPrincipal = serde_json::from_slice(&bytes)
            .map_err(|e| malformed(&format!("invalid principal JSON: {e}")))?;
        if principal.user_id.trim().is_empty() {
            return Err(malformed("principal has an empty userId"));
        }
        Ok(principal)
    }

    pub fn encode(&self) -> StandinResult<String> {
        Ok(STANDARD.encode(serde_json::to_vec(self)?))
    }

    /// Known roles only; unrecognized role names are dropped.
    pub fn roles(&self) -> BTreeSet<Role> {
        self.user_roles
            .iter()
            .filter_map(|r| Role::from_claim(r))
            .collect()
    }

    pub fn into_identity(self) -> Identity {
        let roles = self.roles();
        let email = self.user_details.contains('@').then(|| self.user_details.clone());
        Identity {
            caller_id: Some(self.user_id),
            email,
            roles,
            source: SourceMode::Provider,
            identity_provider: Some(self.identity_provider),
        }
    }
}

fn malformed(message: &str) -> StandinError {
    StandinError::IdentityMalformed {
        message: message.to_string(),
        context: ErrorContext::new("identity")
            .with_operation("decode_principal")
            .with_suggestion("Verify the upstream provider attaches a valid client principal"),
    }
}

/// Developer-selectable mock identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum MockMode {
    Admin,
    User,
    Anonymous,
}

impl MockMode {
    pub const ALL: [MockMode; 3] = [MockMode::Admin, MockMode::User, MockMode::Anonymous];

    pub const ADMIN_CALLER_ID: &'static str = "mock-admin-0001";
    pub const ADMIN_EMAIL: &'static str = "admin@standin.local";
    pub const USER_CALLER_ID: &'static str = "mock-user-0001";
    pub const USER_EMAIL: &'static str = "user@standin.local";

    pub fn as_str(&self) -> &'static str {
        match self {
            MockMode::Admin => "admin",
            MockMode::User => "user",
            MockMode::Anonymous => "anonymous",
        }
    }

    /// The fixed identity this mode stands for.
    pub fn identity(&self) -> Identity {
        match self {
            MockMode::Admin => Identity {
                caller_id: Some(Self::ADMIN_CALLER_ID.to_string()),
                email: Some(Self::ADMIN_EMAIL.to_string()),
                roles: Role::ALL.into_iter().collect(),
                source: SourceMode::Mock,
                identity_provider: Some(MOCK_PROVIDER_NAME.to_string()),
            },
            MockMode::User => Identity {
                caller_id: Some(Self::USER_CALLER_ID.to_string()),
                email: Some(Self::USER_EMAIL.to_string()),
                roles: [Role::User].into_iter().collect(),
                source: SourceMode::Mock,
                identity_provider: Some(MOCK_PROVIDER_NAME.to_string()),
            },
            MockMode::Anonymous => Identity::anonymous(SourceMode::Mock),
        }
    }
}

impl std::fmt::Display for MockMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MockMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(MockMode::Admin),
            "user" => Ok(MockMode::User),
            "anonymous" => Ok(MockMode::Anonymous),
            _ => Err(format!("Unknown mock mode: {}", s)),
        }
    }
}

/// Contract shared by both identity sources.
pub trait IdentitySource: Send + Sync {
    fn mode(&self) -> SourceMode;

    fn resolve_identity(&self, request: &RequestContext) -> Identity;
}

/// Deterministic identities from the configured mock mode.
#[derive(Debug)]
pub struct MockIdentitySource {
    modes: MockModeResolver,
}

impl MockIdentitySource {
    pub fn new(modes: MockModeResolver) -> Self {
        Self { modes }
    }

    pub fn from_config(config: &StandinConfig) -> Self {
        Self::new(MockModeResolver::from_config(config))
    }

    pub fn mock_mode(&self, request: &RequestContext) -> (MockMode, OverrideOrigin) {
        self.modes.resolve(request)
    }
}

impl IdentitySource for MockIdentitySource {
    fn mode(&self) -> SourceMode {
        SourceMode::Mock
    }

    fn resolve_identity(&self, request: &RequestContext) -> Identity {
        let (mode, origin) = self.mock_mode(request);
        debug!(mock_mode = %mode, origin = %origin, "Resolved mock identity");
        mode.identity()
    }
}

/// Parses claims the upstream provider already validated. Never reads the
/// mock override header or cookie.
#[derive(Debug, Clone)]
pub struct ProviderIdentitySource {
    principal_header: String,
}

impl ProviderIdentitySource {
    pub fn new(principal_header: impl Into<String>) -> Self {
        Self {
            principal_header: principal_header.into(),
        }
    }

    pub fn from_config(config: &StandinConfig) -> Self {
        Self::new(config.provider.principal_header.clone())
    }

    /// Like [`IdentitySource::resolve_identity`] but surfaces malformed claims.
    pub fn try_resolve_identity(&self, request: &RequestContext) -> StandinResult<Identity> {
        let Some(encoded) = request.header(&self.principal_header) else {
            return Ok(Identity::anonymous(SourceMode::Provider));
        };
        let principal = ClientPrincipal::decode(encoded)?;
        if principal.identity_provider == MOCK_PROVIDER_NAME {
            return Err(malformed("mock principal presented to the provider source"));
        }
        Ok(principal.into_identity())
    }
}

impl IdentitySource for ProviderIdentitySource {
    fn mode(&self) -> SourceMode {
        SourceMode::Provider
    }

    fn resolve_identity(&self, request: &RequestContext) -> Identity {
        match self.try_resolve_identity(request) {
            Ok(identity) => identity,
            Err(error) => {
                // Fail closed: malformed claims never grant anything.
                warn!(error = %error, "Provider claims rejected, treating caller as anonymous");
                Identity::anonymous(SourceMode::Provider)
            }
        }
    }
}

/// The source chosen for one request.
#[derive(Debug, Clone, Copy)]
pub enum IdentityAdapter<'a> {
    Mock(&'a MockIdentitySource),
    Provider(&'a ProviderIdentitySource),
}

impl IdentitySource for IdentityAdapter<'_> {
    fn mode(&self) -> SourceMode {
        match self {
            IdentityAdapter::Mock(source) => source.mode(),
            IdentityAdapter::Provider(source) => source.mode(),
        }
    }

    fn resolve_identity(&self, request: &RequestContext) -> Identity {
        let identity = match self {
            IdentityAdapter::Mock(source) => source.resolve_identity(request),
            IdentityAdapter::Provider(source) => source.resolve_identity(request),
        };
        assert_exclusive(self.mode(), &identity);
        identity
    }
}

/// Mock and provider identities must never cross. A mismatch is a
/// programming error, not a runtime condition.
pub fn assert_exclusive(mode: SourceMode, identity: &Identity) {
    assert_eq!(
        identity.source, mode,
        "identity source {} produced under {} mode",
        identity.source, mode
    );
    if mode == SourceMode::Provider {
        assert_ne!(
            identity.identity_provider.as_deref(),
            Some(MOCK_PROVIDER_NAME),
            "mock principal surfaced in provider mode"
        );
    }
}
