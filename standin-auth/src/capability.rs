//! Capability gate
//!
//! Decides *which* operations a role may invoke. Quantity limits for
//! anonymous callers live in the usage limiter.

use crate::role::Role;
use serde::{Deserialize, Serialize};
use standin_core::{ErrorContext, StandinError, StandinResult};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Lowest-cost model tier
    InvokeBasicModel,
    InvokeAdvancedModel,
    ReadCollections,
    ManageCollections,
    ManagePrompts,
    Administer,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::InvokeBasicModel => write!(f, "invoke_basic_model"),
            Capability::InvokeAdvancedModel => write!(f, "invoke_advanced_model"),
            Capability::ReadCollections => write!(f, "read_collections"),
            Capability::ManageCollections => write!(f, "manage_collections"),
            Capability::ManagePrompts => write!(f, "manage_prompts"),
            Capability::Administer => write!(f, "administer"),
        }
    }
}

impl std::str::FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "invoke_basic_model" => Ok(Capability::InvokeBasicModel),
            "invoke_advanced_model" => Ok(Capability::InvokeAdvancedModel),
            "read_collections" => Ok(Capability::ReadCollections),
            "manage_collections" => Ok(Capability::ManageCollections),
            "manage_prompts" => Ok(Capability::ManagePrompts),
            "administer" => Ok(Capability::Administer),
            _ => Err(format!("Unknown capability: {}", s)),
        }
    }
}

impl Role {
    /// Fixed capability set for this role.
    pub fn capabilities(&self) -> HashSet<Capability> {
        use Capability::*;

        match self {
            Role::Anonymous => [InvokeBasicModel].into_iter().collect(),
            Role::Guest => [InvokeBasicModel, ReadCollections].into_iter().collect(),
            Role::User => [
                InvokeBasicModel,
                InvokeAdvancedModel,
                ReadCollections,
                ManageCollections,
                ManagePrompts,
            ]
            .into_iter()
            .collect(),
            Role::Admin => [
                InvokeBasicModel,
                InvokeAdvancedModel,
                ReadCollections,
                ManageCollections,
                ManagePrompts,
                Administer,
            ]
            .into_iter()
            .collect(),
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// `CapabilityDenied` unless the role holds `capability`.
    pub fn require(&self, capability: Capability) -> StandinResult<()> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(StandinError::CapabilityDenied {
                capability: capability.to_string(),
                role: self.to_string(),
                context: ErrorContext::new("capability")
                    .with_operation("require")
                    .with_suggestion("Sign in with an account that holds this capability"),
            })
        }
    }
}
