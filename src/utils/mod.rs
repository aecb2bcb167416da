//! Custom utilities.

pub mod error;

pub use error::{AuthError, BackendError, Result};
