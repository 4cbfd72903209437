//! Application state shared by all handlers

use standin_auth::AuthService;
use standin_core::{StandinConfig, StandinResult};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<StandinConfig>,
    pub auth: Arc<AuthService>,
}

impl AppState {
    /// State with in-memory stores and the wall clock.
    pub fn new(config: StandinConfig) -> StandinResult<Self> {
        let auth = AuthService::from_config(&config)?;
        Ok(Self::with_auth(config, auth))
    }

    /// State around a pre-built service, e.g. one with an injected clock.
    pub fn with_auth(config: StandinConfig, auth: AuthService) -> Self {
        Self {
            config: Arc::new(config),
            auth: Arc::new(auth),
        }
    }

    /// Periodic housekeeping; returns the number of usage records dropped.
    pub async fn cleanup_old_data(&self) -> usize {
        self.auth.usage().purge_expired().await
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("address", &self.config.address())
            .field("auth", &self.auth)
            .finish()
    }
}
