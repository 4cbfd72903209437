//! Anonymous usage limiter
//!
//! Enforces the fixed daily quota for anonymous keys. The window is the UTC
//! calendar day; counters never carry across days and never exceed the limit.

use super::store::{MemoryUsageStore, UsageRecord, UsageStore};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use standin_core::{
    next_utc_midnight, validation_error, Clock, ErrorContext, StandinConfig, StandinError,
    StandinResult, SystemClock,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Usage state for one key as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UsageSnapshot {
    pub anonymous_key: String,
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
    pub window_start: NaiveDate,
    pub resets_at: DateTime<Utc>,
}

impl UsageSnapshot {
    fn from_record(record: &UsageRecord) -> Self {
        Self {
            anonymous_key: record.anonymous_key.clone(),
            used: record.count,
            limit: record.limit,
            remaining: record.remaining(),
            window_start: record.window_start,
            resets_at: next_utc_midnight(record.window_start),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageDecision {
    Allowed(UsageSnapshot),
    LimitExceeded(UsageSnapshot),
}

impl UsageDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, UsageDecision::Allowed(_))
    }

    pub fn snapshot(&self) -> &UsageSnapshot {
        match self {
            UsageDecision::Allowed(snapshot) | UsageDecision::LimitExceeded(snapshot) => snapshot,
        }
    }
}

pub struct AnonymousUsageLimiter {
    store: Arc<dyn UsageStore>,
    clock: Arc<dyn Clock>,
    daily_limit: u32,
}

impl AnonymousUsageLimiter {
    pub const DEFAULT_DAILY_LIMIT: u32 = 5;

    pub fn new(store: Arc<dyn UsageStore>, clock: Arc<dyn Clock>, daily_limit: u32) -> Self {
        Self {
            store,
            clock,
            daily_limit,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryUsageStore::new()),
            Arc::new(SystemClock),
            Self::DEFAULT_DAILY_LIMIT,
        )
    }

    pub fn from_config(
        config: &StandinConfig,
        store: Arc<dyn UsageStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::new(store, clock, config.usage.daily_limit)
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    /// Charge `cost` against today's window if it fits.
    pub async fn check_and_consume(&self, anonymous_key: &str, cost: u32) -> StandinResult<UsageDecision> {
        validate_key(anonymous_key)?;
        if cost == 0 {
            return Err(validation_error!("cost must be at least 1", "cost", "usage"));
        }

        let today = self.clock.today();
        let outcome = self
            .store
            .compare_and_increment(anonymous_key, today, cost, self.daily_limit)
            .await;
        let snapshot = UsageSnapshot::from_record(&outcome.record);

        if outcome.applied {
            debug!(
                key = anonymous_key,
                used = snapshot.used,
                remaining = snapshot.remaining,
                "Anonymous usage recorded"
            );
            Ok(UsageDecision::Allowed(snapshot))
        } else {
            info!(
                key = anonymous_key,
                used = snapshot.used,
                limit = snapshot.limit,
                "Anonymous daily limit reached"
            );
            Ok(UsageDecision::LimitExceeded(snapshot))
        }
    }

    /// Like [`Self::check_and_consume`] with a refusal surfaced as `QuotaExceeded`.
    pub async fn consume(&self, anonymous_key: &str, cost: u32) -> StandinResult<UsageSnapshot> {
        match self.check_and_consume(anonymous_key, cost).await? {
            UsageDecision::Allowed(snapshot) => Ok(snapshot),
            UsageDecision::LimitExceeded(snapshot) => Err(StandinError::QuotaExceeded {
                used: snapshot.used,
                limit: snapshot.limit,
                remaining: snapshot.remaining,
                resets_at: snapshot.resets_at,
                retry_after_secs: (snapshot.resets_at - self.clock.now())
                    .num_seconds()
                    .max(0) as u64,
                context: ErrorContext::new("usage")
                    .with_operation("consume")
                    .with_metadata("anonymous_key", &snapshot.anonymous_key)
                    .with_suggestion("Sign in or wait for the daily window to reset"),
            }),
        }
    }

    /// Today's usage without charging anything.
    pub async fn usage(&self, anonymous_key: &str) -> StandinResult<UsageSnapshot> {
        validate_key(anonymous_key)?;
        let today = self.clock.today();
        let record = self
            .store
            .get(anonymous_key, today)
            .await
            .unwrap_or_else(|| UsageRecord::empty(anonymous_key, today, self.daily_limit));
        Ok(UsageSnapshot::from_record(&record))
    }

    /// Drop records from windows before today.
    pub async fn purge_expired(&self) -> usize {
        let purged = self.store.purge_before(self.clock.today()).await;
        if purged > 0 {
            info!(purged, "Purged stale usage records");
        }
        purged
    }
}

impl std::fmt::Debug for AnonymousUsageLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnonymousUsageLimiter")
            .field("clock", &self.clock)
            .field("daily_limit", &self.daily_limit)
            .finish()
    }
}

fn validate_key(anonymous_key: &str) -> StandinResult<()> {
    if anonymous_key.trim().is_empty() {
        return Err(validation_error!(
            "anonymous key must not be empty",
            "anonymous_key",
            "usage"
        ));
    }
    Ok(())
}
