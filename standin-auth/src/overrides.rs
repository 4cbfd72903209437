//! Ordered override lookups
//!
//! A chain of named lookups evaluated in priority order. The first lookup
//! yielding an accepted value wins. Used for the mock mode, where a
//! developer's runtime override beats the environment setting, which beats
//! the compiled default.

use crate::identity::MockMode;
use crate::request::RequestContext;
use standin_core::StandinConfig;
use tracing::warn;

type LookupFn = Box<dyn Fn(&RequestContext) -> Option<String> + Send + Sync>;

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideOrigin {
    RuntimeHeader,
    RuntimeCookie,
    Environment,
    CompiledDefault,
}

impl std::fmt::Display for OverrideOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverrideOrigin::RuntimeHeader => write!(f, "runtime_header"),
            OverrideOrigin::RuntimeCookie => write!(f, "runtime_cookie"),
            OverrideOrigin::Environment => write!(f, "environment"),
            OverrideOrigin::CompiledDefault => write!(f, "compiled_default"),
        }
    }
}

struct Lookup {
    origin: OverrideOrigin,
    lookup: LookupFn,
}

pub struct OverrideChain {
    lookups: Vec<Lookup>,
}

impl OverrideChain {
    pub fn new() -> Self {
        Self {
            lookups: Vec::new(),
        }
    }

    /// Append a lookup with lower priority than every lookup added before it.
    pub fn then<F>(mut self, origin: OverrideOrigin, lookup: F) -> Self
    where
        F: Fn(&RequestContext) -> Option<String> + Send + Sync + 'static,
    {
        self.lookups.push(Lookup {
            origin,
            lookup: Box::new(lookup),
        });
        self
    }

    /// First defined value, unparsed.
    pub fn resolve(&self, ctx: &RequestContext) -> Option<(String, OverrideOrigin)> {
        self.lookups
            .iter()
            .find_map(|entry| (entry.lookup)(ctx).map(|value| (value, entry.origin)))
    }

    /// First value that `parse` accepts. Rejected values are logged and
    /// skipped so a typo in an override cannot mask a valid lower layer.
    pub fn resolve_with<T, P>(&self, ctx: &RequestContext, parse: P) -> Option<(T, OverrideOrigin)>
    where
        P: Fn(&str) -> Option<T>,
    {
        for entry in &self.lookups {
            let Some(raw) = (entry.lookup)(ctx) else {
                continue;
            };
            match parse(&raw) {
                Some(value) => return Some((value, entry.origin)),
                None => warn!(origin = %entry.origin, value = %raw, "Ignoring unrecognized override value"),
            }
        }
        None
    }
}

impl Default for OverrideChain {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OverrideChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverrideChain")
            .field(
                "lookups",
                &self.lookups.iter().map(|l| l.origin).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Resolves the mock mode: runtime header > runtime cookie > environment > default.
#[derive(Debug)]
pub struct MockModeResolver {
    chain: OverrideChain,
}

impl MockModeResolver {
    pub const COMPILED_DEFAULT: MockMode = MockMode::Anonymous;

    pub fn new(
        override_header: impl Into<String>,
        override_cookie: impl Into<String>,
        environment_mode: Option<String>,
    ) -> Self {
        let header = override_header.into();
        let cookie = override_cookie.into();

        let chain = OverrideChain::new()
            .then(OverrideOrigin::RuntimeHeader, move |ctx| {
                ctx.header(&header).map(str::to_string)
            })
            .then(OverrideOrigin::RuntimeCookie, move |ctx| {
                ctx.cookie(&cookie).map(str::to_string)
            })
            .then(OverrideOrigin::Environment, move |_| environment_mode.clone())
            .then(OverrideOrigin::CompiledDefault, |_| {
                Some(Self::COMPILED_DEFAULT.as_str().to_string())
            });

        Self { chain }
    }

    pub fn from_config(config: &StandinConfig) -> Self {
        Self::new(
            config.mock.override_header.clone(),
            config.mock.override_cookie.clone(),
            config.mock.mode.clone(),
        )
    }

    pub fn resolve(&self, ctx: &RequestContext) -> (MockMode, OverrideOrigin) {
        self.chain
            .resolve_with(ctx, |raw| raw.parse().ok())
            .unwrap_or((Self::COMPILED_DEFAULT, OverrideOrigin::CompiledDefault))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(env: Option<&str>) -> MockModeResolver {
        MockModeResolver::new(
            "x-standin-mock-mode",
            "standin_mock_mode",
            env.map(str::to_string),
        )
    }

    #[test]
    fn compiled_default_when_nothing_set() {
        let (mode, origin) = resolver(None).resolve(&RequestContext::new());
        assert_eq!(mode, MockMode::Anonymous);
        assert_eq!(origin, OverrideOrigin::CompiledDefault);
    }

    #[test]
    fn environment_beats_default() {
        let (mode, origin) = resolver(Some("user")).resolve(&RequestContext::new());
        assert_eq!(mode, MockMode::User);
        assert_eq!(origin, OverrideOrigin::Environment);
    }

    #[test]
    fn runtime_override_beats_environment() {
        let ctx = RequestContext::new().with_header("Cookie", "standin_mock_mode=admin");
        let (mode, origin) = resolver(Some("user")).resolve(&ctx);
        assert_eq!(mode, MockMode::Admin);
        assert_eq!(origin, OverrideOrigin::RuntimeCookie);

        let ctx = ctx.with_header("x-standin-mock-mode", "anonymous");
        let (mode, origin) = resolver(Some("user")).resolve(&ctx);
        assert_eq!(mode, MockMode::Anonymous);
        assert_eq!(origin, OverrideOrigin::RuntimeHeader);
    }

    #[test]
    fn unrecognized_values_fall_through() {
        let ctx = RequestContext::new().with_header("x-standin-mock-mode", "root");
        let (mode, origin) = resolver(Some("superuser")).resolve(&ctx);
        assert_eq!(mode, MockMode::Anonymous);
        assert_eq!(origin, OverrideOrigin::CompiledDefault);
    }

    #[test]
    fn raw_resolution_stops_at_first_defined() {
        let chain = OverrideChain::new()
            .then(OverrideOrigin::RuntimeHeader, |_| None)
            .then(OverrideOrigin::Environment, |_| Some("first".to_string()))
            .then(OverrideOrigin::CompiledDefault, |_| Some("second".to_string()));
        assert_eq!(
            chain.resolve(&RequestContext::new()),
            Some(("first".to_string(), OverrideOrigin::Environment))
        );
    }
}
