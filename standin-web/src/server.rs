//! Standin Web Server
//!
//! Main web server implementation using Axum.

use crate::{create_app, AppState, WebError, WebResult};
use standin_auth::AuthService;
use standin_core::StandinConfig;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub struct StandinServer {
    config: StandinConfig,
    state: AppState,
}

impl StandinServer {
    pub fn new(config: StandinConfig) -> WebResult<Self> {
        let state = AppState::new(config.clone())?;
        Ok(Self { config, state })
    }

    pub fn with_auth(config: StandinConfig, auth: AuthService) -> Self {
        let state = AppState::with_auth(config.clone(), auth);
        Self { config, state }
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn start(self) -> WebResult<()> {
        let address = self.config.address();
        let listener = TcpListener::bind(&address).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> WebResult<()> {
        let local_addr = listener.local_addr()?;
        info!(
            address = %local_addr,
            dev_mode = self.config.server.dev_mode,
            production_hosts = ?self.config.environment.production_hosts,
            "Starting standin web server"
        );
        if self.config.environment.force_mode.as_deref() == Some("mock") {
            warn!("Mock identities are forced for every non-production host");
        }

        let gc = spawn_usage_gc(
            self.state.clone(),
            Duration::from_secs(self.config.usage.gc_interval_secs),
        );

        let app = create_app(self.state.clone());
        let result = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await;

        gc.abort();
        if let Err(e) = result {
            error!(error = %e, "Server error");
            return Err(WebError::Server(e));
        }
        info!("Server shut down");
        Ok(())
    }

    pub fn config(&self) -> &StandinConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// Purge stale usage records every `interval`. Guest sessions are left to
/// lazy expiry.
pub fn spawn_usage_gc(state: AppState, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            state.cleanup_old_data().await;
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Builder for [`StandinServer`]
pub struct StandinServerBuilder {
    config: StandinConfig,
}

impl StandinServerBuilder {
    pub fn new(config: StandinConfig) -> Self {
        Self { config }
    }

    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn dev_mode(mut self, dev_mode: bool) -> Self {
        self.config.server.dev_mode = dev_mode;
        self
    }

    pub fn build(self) -> WebResult<StandinServer> {
        StandinServer::new(self.config)
    }
}

impl Default for StandinServerBuilder {
    fn default() -> Self {
        Self::new(StandinConfig::default())
    }
}
