//! Per-request caller context

use crate::capability::Capability;
use crate::environment::SourceMode;
use crate::identity::{Identity, MockMode};
use crate::role::{Role, RoleAssignment};
use crate::session::GuestSession;
use serde::Serialize;
use standin_core::StandinResult;

/// Placeholder address when neither a forwarded hop nor a peer is known.
pub const UNKNOWN_CLIENT_ADDRESS: &str = "unknown";

/// Everything the auth flow derived for one request. Built fresh per request
/// and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallerContext {
    pub identity: Identity,
    pub assignment: RoleAssignment,
    /// Active guest session presented by an identity-less caller
    pub guest_session: Option<GuestSession>,
    pub mode: SourceMode,
    /// Set only when `mode` is `Mock`
    pub mock_mode: Option<MockMode>,
    pub client_address: Option<String>,
}

impl CallerContext {
    /// Role used for capability checks. A guest session lifts an anonymous
    /// caller to `Guest`; it never lowers a resolved role.
    pub fn effective_role(&self) -> Role {
        if self.guest_session.is_some() {
            self.assignment.role.max(Role::Guest)
        } else {
            self.assignment.role
        }
    }

    /// Key for the anonymous usage limiter, `None` for account holders.
    pub fn anonymous_key(&self) -> Option<String> {
        if self.effective_role() >= Role::User {
            return None;
        }
        if let Some(session) = &self.guest_session {
            return Some(format!("session:{}", session.session_id));
        }
        Some(format!(
            "ip:{}",
            self.client_address
                .as_deref()
                .unwrap_or(UNKNOWN_CLIENT_ADDRESS)
        ))
    }

    pub fn is_metered(&self) -> bool {
        self.anonymous_key().is_some()
    }

    pub fn require(&self, capability: Capability) -> StandinResult<()> {
        self.effective_role().require(capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::ResolvedVia;
    use chrono::{Duration, Utc};
    use std::collections::HashMap;

    fn anonymous_caller() -> CallerContext {
        CallerContext {
            identity: Identity::anonymous(SourceMode::Mock),
            assignment: RoleAssignment::anonymous_default(None),
            guest_session: None,
            mode: SourceMode::Mock,
            mock_mode: Some(MockMode::Anonymous),
            client_address: Some("198.51.100.4".to_string()),
        }
    }

    fn guest_session() -> GuestSession {
        let now = Utc::now();
        GuestSession {
            session_id: "gs-1".to_string(),
            created_at: now,
            expires_at: now + Duration::hours(24),
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn anonymous_caller_keyed_by_address() {
        let caller = anonymous_caller();
        assert_eq!(caller.effective_role(), Role::Anonymous);
        assert_eq!(caller.anonymous_key().as_deref(), Some("ip:198.51.100.4"));

        let caller = CallerContext {
            client_address: None,
            ..anonymous_caller()
        };
        assert_eq!(caller.anonymous_key().as_deref(), Some("ip:unknown"));
    }

    #[test]
    fn guest_session_lifts_role_and_key() {
        let caller = CallerContext {
            guest_session: Some(guest_session()),
            ..anonymous_caller()
        };
        assert_eq!(caller.effective_role(), Role::Guest);
        assert_eq!(caller.anonymous_key().as_deref(), Some("session:gs-1"));
        assert!(caller.require(Capability::ReadCollections).is_ok());
        assert!(caller.require(Capability::InvokeAdvancedModel).is_err());
    }

    #[test]
    fn account_holders_are_not_metered() {
        let identity = MockMode::User.identity();
        let caller = CallerContext {
            assignment: RoleAssignment::new(identity.caller_id.clone(), Role::User, ResolvedVia::Header),
            identity,
            mock_mode: Some(MockMode::User),
            ..anonymous_caller()
        };
        assert_eq!(caller.anonymous_key(), None);
        assert!(!caller.is_metered());
        assert!(caller.require(Capability::InvokeAdvancedModel).is_ok());
    }
}
