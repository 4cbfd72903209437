//! Standin Auth - local authentication emulation
//!
//! Lets an application run its full authentication flow on a developer
//! machine and switch to the real identity provider once deployed:
//!
//! - Identity source adapters (mock and provider) behind one contract
//! - Role resolution with a single bounded fallback lookup
//! - Guest sessions with a fixed lifetime
//! - Daily quotas for anonymous callers
//! - The environment switch choosing the identity source per request
//!
//! ## Architecture
//!
//! Everything here is framework-agnostic. The HTTP layer (standin-web) turns
//! a request into a [`RequestContext`] and asks [`AuthService`] for a
//! [`CallerContext`].

pub mod capability;
pub mod context;
pub mod environment;
pub mod identity;
pub mod overrides;
pub mod request;
pub mod role;
pub mod roles;
pub mod service;
pub mod session;
pub mod usage;

pub use capability::Capability;
pub use context::{CallerContext, UNKNOWN_CLIENT_ADDRESS};
pub use environment::{EnvironmentSwitch, RuntimeSignals, SourceMode};
pub use identity::{
    assert_exclusive, ClientPrincipal, Identity, IdentityAdapter, IdentitySource,
    MockIdentitySource, MockMode, ProviderIdentitySource, MOCK_PROVIDER_NAME,
};
pub use overrides::{MockModeResolver, OverrideChain, OverrideOrigin};
pub use request::RequestContext;
pub use role::{ResolvedVia, Role, RoleAssignment};
pub use roles::{HttpRoleDirectory, NoRoleDirectory, RoleDirectory, RoleResolver, StaticRoleDirectory};
pub use service::{AuthService, AuthServiceBuilder};
pub use session::{GuestSession, GuestSessionManager, GuestSessionStore, MemorySessionStore, SessionLookup};
pub use usage::{
    AnonymousUsageLimiter, IncrementOutcome, MemoryUsageStore, UsageDecision, UsageRecord,
    UsageSnapshot, UsageStore,
};
