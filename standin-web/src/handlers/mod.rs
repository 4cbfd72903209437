//! HTTP request handlers for the standin web server

pub mod guest;
pub mod health;
pub mod identity;
pub mod invoke;
pub mod mock_auth;
pub mod usage;

pub use guest::*;
pub use health::*;
pub use identity::*;
pub use invoke::*;
pub use mock_auth::*;
pub use usage::*;
