//! Shared frontend services and hooks.

pub mod context;
pub mod cooldown;
pub mod database_check;

pub use context::{AppServices, AuthContext};
pub use cooldown::use_cooldown;
pub use database_check::{DatabaseCheck, use_database_check};
