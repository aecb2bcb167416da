//! Profile reconciliation: every authenticated user ends up with exactly one
//! `profiles` row.
//!
//! The row may legitimately be missing the first time a user signs in (the
//! database trigger that creates it can lag, or not exist at all), so a
//! missing row is created here with safe defaults. Calls are serialized per
//! user id, and a duplicate-key error on insert is treated as "someone else
//! created it" followed by a re-fetch; the table's primary key is the final
//! arbiter of uniqueness.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;

use crate::backend::models::{NewProfile, Profile, User};
use crate::backend::provider::{AuthProvider, ProfileStore};
use crate::backend::utils::retry::RetryPolicy;
use crate::utils::error::{AuthError, BackendError, Result};

pub struct ProfileReconciler {
    provider: Arc<dyn AuthProvider>,
    profiles: Arc<dyn ProfileStore>,
    create_policy: RetryPolicy,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ProfileReconciler {
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        profiles: Arc<dyn ProfileStore>,
        create_policy: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            profiles,
            create_policy,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, user_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        locks.entry(user_id.to_string()).or_default().clone()
    }

    /// Drops the map entry once no other caller holds or waits on it.
    fn release(&self, user_id: &str, lock: Arc<AsyncMutex<()>>) {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        // One reference in the map, one here
        if Arc::strong_count(&lock) == 2 {
            locks.remove(user_id);
        }
    }

    async fn serialized<T>(&self, user_id: &str, work: impl Future<Output = T>) -> T {
        let lock = self.lock_for(user_id);
        let result = {
            let _serialized = lock.lock().await;
            work.await
        };
        self.release(user_id, lock);
        result
    }

    /// Re-verifies the identity with the provider rather than trusting
    /// cached state, and refuses to act for anyone else.
    async fn verified_user(&self, user_id: &str) -> Result<User> {
        match self.provider.get_user().await {
            Ok(Some(user)) if user.id == user_id => Ok(user),
            Ok(Some(user)) => {
                log::warn!("Profile requested for {user_id} while signed in as {}", user.id);
                Err(AuthError::NotAuthenticated)
            }
            Ok(None) => Err(AuthError::NotAuthenticated),
            Err(e) => {
                log::warn!("Identity check failed: {e}");
                Err(AuthError::NotAuthenticated)
            }
        }
    }

    /// Fetch-or-create the profile of `user_id`.
    pub async fn fetch_profile(&self, user_id: &str) -> Result<Profile> {
        self.serialized(user_id, self.fetch_or_create(user_id)).await
    }

    /// Creates the default profile of `user_id`, even if one exists.
    pub async fn create_profile(&self, user_id: &str) -> Result<Profile> {
        self.serialized(user_id, self.create_for(user_id)).await
    }

    async fn create_for(&self, user_id: &str) -> Result<Profile> {
        let user = self.verified_user(user_id).await?;
        self.create_default(&user).await
    }

    async fn fetch_or_create(&self, user_id: &str) -> Result<Profile> {
        let user = self.verified_user(user_id).await?;

        let exists = self
            .profiles
            .exists(user_id)
            .await
            .map_err(|e| AuthError::ProfileFetch(e.message))?;
        if !exists {
            log::info!("No profile for {user_id}, creating one");
            return self.create_default(&user).await;
        }

        self.fetch_existing(user_id).await
    }

    async fn fetch_existing(&self, user_id: &str) -> Result<Profile> {
        match self.profiles.fetch(user_id).await {
            Ok(Some(profile)) => Ok(profile),
            Ok(None) => Err(AuthError::EmptyProfileData),
            Err(e) => Err(AuthError::ProfileFetch(e.message)),
        }
    }

    async fn create_default(&self, user: &User) -> Result<Profile> {
        let Some(email) = user.email.as_deref() else {
            return Err(AuthError::ProfileCreationFailed(
                "user has no email address".to_string(),
            ));
        };

        // Leftovers of a half-finished earlier attempt would trip the primary key
        if let Err(e) = self.profiles.delete(&user.id).await {
            log::warn!("Could not clear stale profile row for {}: {e}", user.id);
        }

        let row = NewProfile::for_user(&user.id, email);
        let inserted = self
            .create_policy
            .run_if(
                |attempt| {
                    log::debug!("Inserting profile for {} (attempt {attempt})", row.id);
                    self.profiles.insert(&row)
                },
                |e: &BackendError| !e.is_duplicate_key(),
            )
            .await;

        match inserted {
            Ok(profile) => {
                log::info!("Created profile for {} as {}", profile.id, profile.role);
                Ok(profile)
            }
            Err(e) if e.is_duplicate_key() => {
                log::info!("Profile for {} was created concurrently, re-fetching", user.id);
                self.fetch_existing(&user.id).await
            }
            Err(e) => {
                log::error!("Giving up creating profile for {}: {e}", user.id);
                Err(AuthError::ProfileCreationFailed(e.message))
            }
        }
    }
}
