//! Async utilities

use crate::error::{ErrorContext, StandinError, StandinResult};
use std::time::Duration;
use tokio::time::timeout;

/// Run `future` with an upper bound on its duration.
pub async fn with_timeout<F, T>(future: F, limit: Duration, operation_name: &str) -> StandinResult<T>
where
    F: std::future::Future<Output = T>,
{
    match timeout(limit, future).await {
        Ok(result) => Ok(result),
        Err(_) => Err(StandinError::Timeout {
            operation: operation_name.to_string(),
            duration_ms: limit.as_millis() as u64,
            context: ErrorContext::new("async_utils")
                .with_operation(operation_name)
                .with_metadata("timeout_ms", &limit.as_millis().to_string())
                .with_suggestion("Increase the configured timeout")
                .with_suggestion("Verify the remote service is reachable"),
        }),
    }
}
