//! Anonymous usage metering
//!
//! Per-key daily counters with an atomic check-and-increment. Keys are
//! guest session ids or client addresses, never account ids.

pub mod limiter;
pub mod store;

pub use limiter::{AnonymousUsageLimiter, UsageDecision, UsageSnapshot};
pub use store::{IncrementOutcome, MemoryUsageStore, UsageRecord, UsageStore};
