//! Unified error handling system
//!
//! Structured error types for the emulation layer. Each kind of section of the
//! authentication flow (identity, roles, guest sessions, anonymous quota) has a
//! dedicated variant carrying an [`ErrorContext`] so callers can log and react
//! without string matching.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

pub type StandinResult<T> = Result<T, StandinError>;

/// Error context providing additional information for debugging and recovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Timestamp when error occurred
    pub timestamp: DateTime<Utc>,
    /// Component where error originated
    pub component: String,
    /// Operation being performed when error occurred
    pub operation: Option<String>,
    /// Additional metadata
    pub metadata: std::collections::HashMap<String, String>,
    /// Recovery suggestions
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            metadata: std::collections::HashMap::new(),
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Main error type for standin
#[derive(Error, Debug)]
pub enum StandinError {
    /// Provider claims were present but could not be parsed.
    #[error("Malformed identity claims: {message}")]
    IdentityMalformed {
        message: String,
        context: ErrorContext,
    },

    /// The role-assignment fallback endpoint failed or timed out.
    #[error("Role lookup unavailable: {message}")]
    RoleLookupUnavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    /// Unknown or expired guest session.
    #[error("Guest session not found: {session_hint}")]
    SessionNotFound {
        session_hint: String,
        context: ErrorContext,
    },

    /// Anonymous caller ran out of daily quota.
    #[error("Usage quota exceeded: {used} of {limit} used, resets at {resets_at}")]
    QuotaExceeded {
        used: u32,
        limit: u32,
        remaining: u32,
        resets_at: DateTime<Utc>,
        /// Seconds from refusal until `resets_at`
        retry_after_secs: u64,
        context: ErrorContext,
    },

    /// The caller's role does not carry the capability an operation needs.
    #[error("Capability denied: {capability} is not granted to role {role}")]
    CapabilityDenied {
        capability: String,
        role: String,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        context: ErrorContext,
    },

    #[error("Operation timeout: {operation}")]
    Timeout {
        operation: String,
        duration_ms: u64,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        context: ErrorContext,
    },
}

impl StandinError {
    /// Get the error context
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            StandinError::IdentityMalformed { context, .. } => Some(context),
            StandinError::RoleLookupUnavailable { context, .. } => Some(context),
            StandinError::SessionNotFound { context, .. } => Some(context),
            StandinError::QuotaExceeded { context, .. } => Some(context),
            StandinError::CapabilityDenied { context, .. } => Some(context),
            StandinError::Config { context, .. } => Some(context),
            StandinError::Validation { context, .. } => Some(context),
            StandinError::Timeout { context, .. } => Some(context),
            StandinError::Internal { context, .. } => Some(context),
            StandinError::Io(_) | StandinError::Serialization(_) => None,
        }
    }

    /// Whether the subsystem boundary can absorb this error.
    ///
    /// Identity, role lookup, session and quota failures are expected runtime
    /// outcomes; configuration and internal failures are not.
    pub fn is_recoverable(&self) -> bool {
        match self {
            StandinError::IdentityMalformed { .. }
            | StandinError::RoleLookupUnavailable { .. }
            | StandinError::SessionNotFound { .. }
            | StandinError::QuotaExceeded { .. }
            | StandinError::CapabilityDenied { .. }
            | StandinError::Timeout { .. } => true,
            StandinError::Config { .. }
            | StandinError::Validation { .. }
            | StandinError::Io(_)
            | StandinError::Serialization(_)
            | StandinError::Internal { .. } => false,
        }
    }

    /// Seconds until the caller may retry, for quota errors.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            StandinError::QuotaExceeded {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        let error_id = self.context().map(|c| c.error_id.as_str());
        match self {
            StandinError::SessionNotFound { .. } | StandinError::QuotaExceeded { .. } => {
                debug!(error_id = ?error_id, error = %self, "Expected access outcome");
            }
            StandinError::IdentityMalformed { .. }
            | StandinError::RoleLookupUnavailable { .. }
            | StandinError::CapabilityDenied { .. }
            | StandinError::Timeout { .. } => {
                warn!(error_id = ?error_id, error = %self, "Recoverable auth error");
            }
            StandinError::Config { .. } | StandinError::Validation { .. } => {
                error!(error_id = ?error_id, error = %self, "Configuration or validation error");
            }
            _ => {
                error!(error_id = ?error_id, error = %self, "Error occurred");
            }
        }
    }
}

/// Convenience macros for creating errors with context
#[macro_export]
macro_rules! config_error {
    ($msg:expr, $component:expr) => {
        $crate::StandinError::Config {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check your standin.toml or STANDIN_* environment variables"),
        }
    };
    ($msg:expr, $component:expr, $source:expr) => {
        $crate::StandinError::Config {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check your standin.toml or STANDIN_* environment variables"),
        }
    };
}

#[macro_export]
macro_rules! validation_error {
    ($msg:expr, $field:expr, $component:expr) => {
        $crate::StandinError::Validation {
            message: $msg.to_string(),
            field: Some($field.to_string()),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check the field value and format"),
        }
    };
}

#[macro_export]
macro_rules! session_not_found {
    ($hint:expr, $component:expr) => {
        $crate::StandinError::SessionNotFound {
            session_hint: $hint.to_string(),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Create a new guest session"),
        }
    };
}
