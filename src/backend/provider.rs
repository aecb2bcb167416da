//! Seams to the hosted backend.
//!
//! The auth store and the reconciler only ever talk to these traits, so the
//! HTTP client can be swapped for in-memory fakes in tests.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::backend::models::{AuthEvent, NewProfile, Profile, Role, Session, SignInData, User};
use crate::utils::error::BackendError;

/// Authentication/session provider.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Current session, restoring it from persisted storage if needed.
    async fn get_session(&self) -> Result<Option<Session>, BackendError>;

    /// Session-change feed. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignInData, BackendError>;

    async fn sign_out(&self) -> Result<(), BackendError>;

    /// Re-validates the current identity with the provider.
    /// `Ok(None)` means there is no session to validate.
    async fn get_user(&self) -> Result<Option<User>, BackendError>;

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), BackendError>;
}

/// The `profiles` table.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn exists(&self, id: &str) -> Result<bool, BackendError>;

    async fn fetch(&self, id: &str) -> Result<Option<Profile>, BackendError>;

    async fn insert(&self, profile: &NewProfile) -> Result<Profile, BackendError>;

    async fn delete(&self, id: &str) -> Result<(), BackendError>;

    async fn count_admins(&self) -> Result<usize, BackendError>;

    async fn set_role(&self, id: &str, role: Role) -> Result<Profile, BackendError>;
}
