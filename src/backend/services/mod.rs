//! Auth services.

pub mod auth_store;
pub mod cooldown;
pub mod diagnostics;
pub mod first_access;
pub mod guard;
pub mod reconciler;

pub use auth_store::{AuthSettings, AuthState, AuthStore};
pub use diagnostics::{DatabaseReport, CheckOutcome, check_database};
pub use first_access::FirstAccess;
pub use guard::{GuardSettings, GuardView, LoadingStage, RedirectTarget, RouteGuard};
pub use reconciler::ProfileReconciler;
