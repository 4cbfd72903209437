//! Guest Sessions
//!
//! Ephemeral, identity-light sessions for callers without an account. A
//! session is active from creation until `expires_at` (inclusive) and is
//! removed lazily by the first lookup that finds it expired.

pub mod manager;
pub mod store;
pub mod types;

pub use manager::GuestSessionManager;
pub use store::{GuestSessionStore, MemorySessionStore};
pub use types::{GuestSession, SessionLookup};
