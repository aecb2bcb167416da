//! First-access bootstrap: while no administrator exists, the signed-in
//! user may promote themselves.

use crate::backend::models::{Profile, Role};
use crate::backend::services::auth_store::AuthStore;
use crate::utils::error::{AuthError, Result};

pub struct FirstAccess {
    store: AuthStore,
}

impl FirstAccess {
    pub fn new(store: AuthStore) -> Self {
        Self { store }
    }

    /// True while the profiles table has no administrator.
    pub async fn is_open(&self) -> Result<bool> {
        self.store
            .profiles()
            .count_admins()
            .await
            .map(|n| n == 0)
            .map_err(|e| AuthError::ProfileFetch(e.message))
    }

    pub async fn claim_admin(&self) -> Result<Profile> {
        if !self.store.snapshot().is_authenticated() {
            return Err(AuthError::NotAuthenticated);
        }
        if !self.is_open().await? {
            log::warn!("First-access claim refused, an administrator already exists");
            return Err(AuthError::FirstAccessClosed);
        }

        let profile = match self.store.snapshot().profile {
            Some(profile) => profile,
            None => self.store.retry_profile_fetch().await?,
        };
        if profile.role == Role::Admin {
            return Ok(profile);
        }

        let promoted = self
            .store
            .profiles()
            .set_role(&profile.id, Role::Admin)
            .await
            .map_err(|e| AuthError::ProfileUpdateFailed(e.message))?;

        log::info!("{} promoted to administrator on first access", promoted.id);
        self.store.replace_profile(promoted.clone());
        Ok(promoted)
    }
}
