//! Concurrent consumption against one anonymous key

use chrono::{TimeZone, Utc};
use standin_auth::{AnonymousUsageLimiter, MemoryUsageStore, UsageDecision};
use standin_core::ManualClock;
use std::sync::Arc;

fn limiter(limit: u32) -> Arc<AnonymousUsageLimiter> {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 9, 1, 12, 0, 0).unwrap(),
    ));
    Arc::new(AnonymousUsageLimiter::new(
        Arc::new(MemoryUsageStore::new()),
        clock,
        limit,
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_get_exactly_limit_allowances() {
    let limiter = limiter(5);

    let handles: Vec<_> = (0..64)
        .map(|_| {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.check_and_consume("ip:203.0.113.9", 1).await })
        })
        .collect();

    let decisions: Vec<UsageDecision> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let allowed = decisions.iter().filter(|d| d.is_allowed()).count();
    assert_eq!(allowed, 5);
    assert!(decisions.iter().all(|d| d.snapshot().used <= 5));

    let usage = limiter.usage("ip:203.0.113.9").await.unwrap();
    assert_eq!(usage.used, 5);
    assert_eq!(usage.remaining, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_keys_do_not_interfere() {
    let limiter = limiter(3);

    let handles: Vec<_> = (0..40)
        .map(|i| {
            let limiter = limiter.clone();
            let key = format!("session:s{}", i % 4);
            tokio::spawn(async move { limiter.check_and_consume(&key, 1).await })
        })
        .collect();

    let allowed = futures::future::join_all(handles)
        .await
        .into_iter()
        .filter(|joined| matches!(joined, Ok(Ok(UsageDecision::Allowed(_)))))
        .count();
    assert_eq!(allowed, 4 * 3);
}
