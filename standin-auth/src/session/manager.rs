//! Guest session manager
//!
//! Issues and looks up guest sessions. Expiry is checked on access; there is
//! no background sweep.

use super::store::{GuestSessionStore, MemorySessionStore};
use super::types::{GuestSession, SessionLookup};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use standin_core::{redact_token, session_not_found, Clock, StandinConfig, StandinResult, SystemClock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Entropy behind each session id.
const SESSION_ID_BYTES: usize = 32;

pub struct GuestSessionManager {
    store: Arc<dyn GuestSessionStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl GuestSessionManager {
    pub const DEFAULT_TTL_HOURS: i64 = 24;

    pub fn new(store: Arc<dyn GuestSessionStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    /// In-memory store, wall clock, default lifetime.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemorySessionStore::new()),
            Arc::new(SystemClock),
            Duration::hours(Self::DEFAULT_TTL_HOURS),
        )
    }

    pub fn from_config(
        config: &StandinConfig,
        store: Arc<dyn GuestSessionStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::new(store, clock, Duration::hours(config.guest.ttl_hours as i64))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn create_session(&self, metadata: HashMap<String, String>) -> GuestSession {
        let created_at = self.clock.now();
        let session = GuestSession {
            session_id: generate_session_id(),
            created_at,
            expires_at: created_at
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            metadata,
        };

        self.store.insert(session.clone()).await;
        info!(
            session = %redact_token(&session.session_id),
            expires_at = %session.expires_at,
            "Created guest session"
        );
        session
    }

    /// Distinguishes unknown from expired. Expired sessions are removed here.
    pub async fn lookup(&self, session_id: &str) -> SessionLookup {
        let Some(session) = self.store.get(session_id).await else {
            return SessionLookup::Unknown;
        };

        if session.is_expired_at(self.clock.now()) {
            self.store.remove(session_id).await;
            debug!(session = %redact_token(session_id), "Removed expired guest session");
            return SessionLookup::Expired(session);
        }
        SessionLookup::Active(session)
    }

    /// Active session, or `SessionNotFound` for both unknown and expired ids.
    pub async fn get_session(&self, session_id: &str) -> StandinResult<GuestSession> {
        match self.lookup(session_id).await {
            SessionLookup::Active(session) => Ok(session),
            outcome => {
                debug!(
                    session = %redact_token(session_id),
                    outcome = outcome.label(),
                    "Guest session lookup missed"
                );
                Err(session_not_found!(redact_token(session_id), "guest_session"))
            }
        }
    }

    pub async fn session_count(&self) -> usize {
        self.store.len().await
    }
}

impl std::fmt::Debug for GuestSessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuestSessionManager")
            .field("clock", &self.clock)
            .field("ttl", &self.ttl)
            .finish()
    }
}

fn generate_session_id() -> String {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
