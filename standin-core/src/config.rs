//! Configuration management
//!
//! Layering, lowest precedence first: compiled defaults, an optional TOML
//! file, then `STANDIN_`-prefixed environment variables using `__` as the
//! section separator (`STANDIN_USAGE__DAILY_LIMIT=10`).

use crate::error::{ErrorContext, StandinError, StandinResult};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Recognized values for `environment.force_mode`.
pub const SOURCE_MODES: [&str; 2] = ["mock", "provider"];

/// Upper bound for `guest.ttl_hours` (one year).
pub const MAX_GUEST_TTL_HOURS: u32 = 24 * 365;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StandinConfig {
    pub server: ServerConfig,
    pub environment: EnvironmentConfig,
    pub mock: MockConfig,
    pub provider: ProviderConfig,
    pub roles: RolesConfig,
    pub guest: GuestConfig,
    pub usage: UsageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Explicit development flag; selects the mock source on non-production hosts.
    pub dev_mode: bool,
    /// Proxy addresses allowed to set `x-forwarded-for`. Empty trusts every peer.
    pub trusted_proxies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Pin the identity source regardless of host signals (`mock` or `provider`).
    pub force_mode: Option<String>,
    /// Host patterns that identify a deployed environment. `*` stands for
    /// one or more leading labels, e.g. `*.example.net`. A non-empty list
    /// also marks the process as deployed.
    pub production_hosts: Vec<String>,
    /// Set by deployment tooling when the process runs in a deployed environment.
    pub deployed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// Environment-level mock mode (`admin`, `user` or `anonymous`).
    pub mode: Option<String>,
    /// Request header carrying a developer's runtime override.
    pub override_header: String,
    /// Cookie carrying a browser-local runtime override.
    pub override_cookie: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Header holding the base64-encoded client principal.
    pub principal_header: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RolesConfig {
    /// Role-assignment fallback endpoint; no fallback lookup when unset.
    pub fallback_url: Option<String>,
    pub fallback_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuestConfig {
    pub ttl_hours: u32,
    pub session_header: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageConfig {
    pub daily_limit: u32,
    pub gc_interval_secs: u64,
}

impl Default for StandinConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            environment: EnvironmentConfig::default(),
            mock: MockConfig::default(),
            provider: ProviderConfig::default(),
            roles: RolesConfig::default(),
            guest: GuestConfig::default(),
            usage: UsageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4280,
            dev_mode: false,
            trusted_proxies: Vec::new(),
        }
    }
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            mode: None,
            override_header: "x-standin-mock-mode".to_string(),
            override_cookie: "standin_mock_mode".to_string(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            principal_header: "x-ms-client-principal".to_string(),
        }
    }
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            fallback_url: None,
            fallback_timeout_ms: 2000,
        }
    }
}

impl Default for GuestConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 24,
            session_header: "x-guest-session".to_string(),
        }
    }
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            daily_limit: 5,
            gc_interval_secs: 3600,
        }
    }
}

fn load_error(message: String, source: config::ConfigError, operation: &str) -> StandinError {
    StandinError::Config {
        message,
        source: Some(Box::new(source)),
        context: ErrorContext::new("config")
            .with_operation(operation)
            .with_suggestion("Check TOML syntax and STANDIN_* variable names"),
    }
}

fn invalid(message: &str) -> StandinError {
    StandinError::Config {
        message: message.to_string(),
        source: None,
        context: ErrorContext::new("config").with_operation("validate"),
    }
}

impl StandinConfig {
    /// Load defaults, then `path` (if given), then the environment.
    pub fn load(path: Option<&Path>) -> StandinResult<Self> {
        let defaults = config::Config::try_from(&StandinConfig::default())
            .map_err(|e| load_error(format!("Failed to encode defaults: {e}"), e, "defaults"))?;

        let mut builder = config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("STANDIN")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("environment.production_hosts")
                .with_list_parse_key("server.trusted_proxies")
                .try_parsing(true),
        );

        let loaded: StandinConfig = builder
            .build()
            .map_err(|e| load_error(format!("Failed to load configuration: {e}"), e, "build"))?
            .try_deserialize()
            .map_err(|e| load_error(format!("Failed to parse configuration: {e}"), e, "deserialize"))?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Parse a TOML document on top of the compiled defaults.
    pub fn from_toml_str(content: &str) -> StandinResult<Self> {
        let parsed: StandinConfig = toml::from_str(content).map_err(|e| StandinError::Config {
            message: format!("Failed to parse config: {e}"),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn validate(&self) -> StandinResult<()> {
        if self.usage.daily_limit == 0 {
            return Err(invalid("usage.daily_limit must be greater than 0"));
        }
        if self.usage.gc_interval_secs == 0 {
            return Err(invalid("usage.gc_interval_secs must be greater than 0"));
        }
        if self.guest.ttl_hours == 0 || self.guest.ttl_hours > MAX_GUEST_TTL_HOURS {
            return Err(StandinError::Config {
                message: format!("guest.ttl_hours must be between 1 and {MAX_GUEST_TTL_HOURS}"),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_metadata("ttl_hours", &self.guest.ttl_hours.to_string()),
            });
        }
        if self.roles.fallback_timeout_ms == 0 {
            return Err(invalid("roles.fallback_timeout_ms must be greater than 0"));
        }
        if let Some(mode) = &self.environment.force_mode {
            if !SOURCE_MODES.contains(&mode.to_lowercase().as_str()) {
                return Err(invalid("environment.force_mode must be 'mock' or 'provider'"));
            }
        }
        for pattern in &self.environment.production_hosts {
            if !is_valid_host_pattern(pattern) {
                return Err(StandinError::Config {
                    message: format!("Invalid production host pattern '{pattern}'"),
                    source: None,
                    context: ErrorContext::new("config")
                        .with_operation("validate")
                        .with_metadata("pattern", pattern)
                        .with_suggestion("Use host names such as 'app.example.net' or '*.example.net'"),
                });
            }
        }
        for proxy in &self.server.trusted_proxies {
            if proxy.trim().parse::<std::net::IpAddr>().is_err() {
                return Err(StandinError::Config {
                    message: format!("Invalid trusted proxy address '{proxy}'"),
                    source: None,
                    context: ErrorContext::new("config")
                        .with_operation("validate")
                        .with_metadata("proxy", proxy),
                });
            }
        }
        for header in [
            &self.mock.override_header,
            &self.provider.principal_header,
            &self.guest.session_header,
        ] {
            if header.trim().is_empty() {
                return Err(invalid("header names must not be empty"));
            }
        }
        Ok(())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// A leading `*` label is allowed; every other label is a plain DNS label.
pub fn is_valid_host_pattern(pattern: &str) -> bool {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return false;
    }
    let labels: Vec<&str> = pattern.split('.').collect();
    labels.iter().enumerate().all(|(index, label)| {
        (index == 0 && *label == "*" && labels.len() > 1)
            || (!label.is_empty()
                && label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-'))
    })
}
