//! Standin Core - shared infrastructure
//!
//! Error taxonomy, configuration, logging and the clock abstraction used by
//! every standin crate.

pub mod async_utils;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use async_utils::*;
pub use clock::*;
pub use config::*;
pub use error::*;
pub use logging::*;

// Re-export commonly used external types
pub use chrono;
pub use tracing;
