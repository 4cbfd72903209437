//! Roles and role assignments

use serde::{Deserialize, Serialize};

/// Caller role, ordered by privilege (`Anonymous` lowest, `Admin` highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Anonymous,
    Guest,
    User,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::User, Role::Guest, Role::Anonymous];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Anonymous => "anonymous",
            Role::Guest => "guest",
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Parse a provider role string. `authenticated` is the provider's
    /// built-in role for any signed-in account and maps to `User`.
    pub fn from_claim(value: &str) -> Option<Role> {
        match value.trim().to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "user" | "authenticated" => Some(Role::User),
            "guest" => Some(Role::Guest),
            "anonymous" => Some(Role::Anonymous),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::from_claim(s).ok_or_else(|| format!("Unknown role: {}", s))
    }
}

/// Which step of the fallback chain produced a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ResolvedVia {
    /// Roles carried by the identity itself
    Header,
    /// External role-assignment endpoint
    FallbackEndpoint,
    /// Nothing else applied
    Default,
}

impl std::fmt::Display for ResolvedVia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolvedVia::Header => write!(f, "header"),
            ResolvedVia::FallbackEndpoint => write!(f, "fallback_endpoint"),
            ResolvedVia::Default => write!(f, "default"),
        }
    }
}

/// Effective role for one request. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RoleAssignment {
    pub caller_id: Option<String>,
    pub role: Role,
    pub resolved_via: ResolvedVia,
}

impl RoleAssignment {
    pub fn new(caller_id: Option<String>, role: Role, resolved_via: ResolvedVia) -> Self {
        Self {
            caller_id,
            role,
            resolved_via,
        }
    }

    pub fn anonymous_default(caller_id: Option<String>) -> Self {
        Self::new(caller_id, Role::Anonymous, ResolvedVia::Default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privilege_order() {
        assert!(Role::Admin > Role::User);
        assert!(Role::User > Role::Guest);
        assert!(Role::Guest > Role::Anonymous);
        assert_eq!(Role::ALL.iter().max(), Some(&Role::Admin));
    }

    #[test]
    fn claim_parsing() {
        assert_eq!(Role::from_claim("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::from_claim(" authenticated "), Some(Role::User));
        assert_eq!(Role::from_claim("owner"), None);
        assert!("superuser".parse::<Role>().is_err());
        assert_eq!("guest".parse::<Role>().unwrap(), Role::Guest);
    }

    #[test]
    fn serializes_lowercase() {
        let assignment = RoleAssignment::new(
            Some("u1".to_string()),
            Role::User,
            ResolvedVia::FallbackEndpoint,
        );
        let json = serde_json::to_value(&assignment).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["resolved_via"], "fallback_endpoint");
    }
}
