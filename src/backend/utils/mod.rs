//! Utility modules for the backend.

/// Injectable monotonic clock.
pub mod clock;
/// Backend connection settings.
pub mod config;
/// Application data directory.
pub mod paths;
/// Retry with fixed or exponential backoff.
pub mod retry;
