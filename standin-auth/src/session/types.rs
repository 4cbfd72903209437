//! Guest session types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct GuestSession {
    /// Opaque, unguessable token
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    /// Always `created_at + ttl`; never extended
    pub expires_at: DateTime<Utc>,
    pub metadata: HashMap<String, String>,
}

impl GuestSession {
    /// Expired strictly after `expires_at`; the boundary instant is still active.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.created_at <= now && !self.is_expired_at(now)
    }
}

/// Internal lookup outcome. Callers outside the manager only ever see
/// `Active` or `SessionNotFound`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionLookup {
    Active(GuestSession),
    Expired(GuestSession),
    Unknown,
}

impl SessionLookup {
    pub fn label(&self) -> &'static str {
        match self {
            SessionLookup::Active(_) => "active",
            SessionLookup::Expired(_) => "expired",
            SessionLookup::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn boundary_instant_is_active() {
        let created_at = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        let session = GuestSession {
            session_id: "s".to_string(),
            created_at,
            expires_at: created_at + Duration::hours(24),
            metadata: HashMap::new(),
        };

        assert!(session.is_active_at(created_at));
        assert!(session.is_active_at(session.expires_at));
        assert!(!session.is_active_at(session.expires_at + Duration::seconds(1)));
        assert!(session.is_expired_at(session.expires_at + Duration::milliseconds(1)));
    }
}
