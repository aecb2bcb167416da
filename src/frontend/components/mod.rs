//! UI components.

pub mod config_error;
pub mod guard;
pub mod layout;
pub mod loading;
pub mod navigation;
pub mod toast;

pub use guard::ProtectedRoute;
pub use layout::{AppShell, AuthLayout};
