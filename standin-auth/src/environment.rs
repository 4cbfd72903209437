//! Environment switch
//!
//! Decides whether a request is served by the mock identity source or the
//! real provider. The decision is a pure function of [`RuntimeSignals`]; the
//! switch holds only the compiled host patterns.

use regex::Regex;
use serde::{Deserialize, Serialize};
use standin_core::{ErrorContext, StandinConfig, StandinError, StandinResult};
use tracing::warn;

/// Which identity source backs a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    Mock,
    Provider,
}

impl std::fmt::Display for SourceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceMode::Mock => write!(f, "mock"),
            SourceMode::Provider => write!(f, "provider"),
        }
    }
}

impl std::str::FromStr for SourceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mock" => Ok(SourceMode::Mock),
            "provider" => Ok(SourceMode::Provider),
            _ => Err(format!("Unknown source mode: {}", s)),
        }
    }
}

/// Observed environment for one decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeSignals {
    /// Request host without port
    pub host: Option<String>,
    /// Explicit development flag
    pub dev_flag: bool,
    /// Deployment tooling marked this process as deployed
    pub deployed: bool,
    /// Operator pinned the source
    pub force_mode: Option<SourceMode>,
}

impl RuntimeSignals {
    pub fn for_host(host: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnvironmentSwitch {
    production_hosts: Vec<Regex>,
}

impl EnvironmentSwitch {
    pub fn new<S: AsRef<str>>(production_hosts: &[S]) -> StandinResult<Self> {
        let production_hosts = production_hosts
            .iter()
            .map(|pattern| compile_host_pattern(pattern.as_ref()))
            .collect::<StandinResult<Vec<_>>>()?;
        Ok(Self { production_hosts })
    }

    pub fn from_config(config: &StandinConfig) -> StandinResult<Self> {
        Self::new(&config.environment.production_hosts)
    }

    /// Signals for a request to `host`, combined with the process-level settings.
    ///
    /// A process configured with production hosts counts as deployed, so a
    /// request whose host is missing or not listed still reaches the provider
    /// unless the development flag or a mock pin is set.
    pub fn signals(config: &StandinConfig, host: Option<&str>) -> RuntimeSignals {
        RuntimeSignals {
            host: host.map(str::to_string),
            dev_flag: config.server.dev_mode,
            deployed: config.environment.deployed
                || !config.environment.production_hosts.is_empty(),
            force_mode: config
                .environment
                .force_mode
                .as_deref()
                .and_then(|mode| mode.parse().ok()),
        }
    }

    /// Pick the identity source.
    ///
    /// Order: a production host always selects the provider, then an explicit
    /// pin, then the development flag, then the deployed flag. Anything left
    /// (local or unrecognized hosts) runs against the mock.
    pub fn select_mode(&self, signals: &RuntimeSignals) -> SourceMode {
        if let Some(host) = signals.host.as_deref() {
            if self.is_production_host(host) {
                if signals.force_mode == Some(SourceMode::Mock) {
                    warn!(host, "Ignoring forced mock mode on a production host");
                }
                return SourceMode::Provider;
            }
        }

        if let Some(mode) = signals.force_mode {
            return mode;
        }
        if signals.dev_flag {
            return SourceMode::Mock;
        }
        if signals.deployed {
            return SourceMode::Provider;
        }
        SourceMode::Mock
    }

    pub fn is_production_host(&self, host: &str) -> bool {
        let host = host.trim().trim_end_matches('.').to_lowercase();
        self.production_hosts.iter().any(|re| re.is_match(&host))
    }
}

fn compile_host_pattern(pattern: &str) -> StandinResult<Regex> {
    let pattern = pattern.trim().to_lowercase();
    let body = match pattern.strip_prefix("*.") {
        Some(rest) => format!(r"(?:[a-z0-9-]+\.)+{}", regex::escape(rest)),
        None => regex::escape(&pattern),
    };
    Regex::new(&format!("^{body}$")).map_err(|e| StandinError::Config {
        message: format!("Invalid production host pattern '{pattern}': {e}"),
        source: Some(Box::new(e)),
        context: ErrorContext::new("environment").with_operation("compile_host_pattern"),
    })
}
