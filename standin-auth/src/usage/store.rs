//! Usage record storage

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Consumption for one anonymous key within one UTC day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub anonymous_key: String,
    pub window_start: NaiveDate,
    pub count: u32,
    pub limit: u32,
}

impl UsageRecord {
    pub fn empty(anonymous_key: impl Into<String>, window_start: NaiveDate, limit: u32) -> Self {
        Self {
            anonymous_key: anonymous_key.into(),
            window_start,
            count: 0,
            limit,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncrementOutcome {
    /// Whether the cost was added
    pub applied: bool,
    /// Record after the operation
    pub record: UsageRecord,
}

#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Add `cost` to the record for (`key`, `day`) only if the result stays
    /// within `limit`. Check and write are one atomic step per key.
    async fn compare_and_increment(
        &self,
        key: &str,
        day: NaiveDate,
        cost: u32,
        limit: u32,
    ) -> IncrementOutcome;

    async fn get(&self, key: &str, day: NaiveDate) -> Option<UsageRecord>;

    /// Drop records whose window started before `day`. Returns how many.
    async fn purge_before(&self, day: NaiveDate) -> usize;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryUsageStore {
    records: Arc<RwLock<HashMap<(String, NaiveDate), UsageRecord>>>,
}

impl MemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn compare_and_increment(
        &self,
        key: &str,
        day: NaiveDate,
        cost: u32,
        limit: u32,
    ) -> IncrementOutcome {
        let mut records = self.records.write().await;
        let record = records
            .entry((key.to_string(), day))
            .or_insert_with(|| UsageRecord::empty(key, day, limit));
        record.limit = limit;

        let applied = match record.count.checked_add(cost) {
            Some(next) if next <= limit => {
                record.count = next;
                true
            }
            _ => false,
        };

        IncrementOutcome {
            applied,
            record: record.clone(),
        }
    }

    async fn get(&self, key: &str, day: NaiveDate) -> Option<UsageRecord> {
        let records = self.records.read().await;
        records.get(&(key.to_string(), day)).cloned()
    }

    async fn purge_before(&self, day: NaiveDate) -> usize {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|(_, window_start), _| *window_start >= day);
        before - records.len()
    }
}
