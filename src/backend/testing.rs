//! In-memory stand-ins for the hosted backend.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::broadcast;

use crate::backend::models::{AuthEvent, NewProfile, Profile, Role, Session, SignInData, User};
use crate::backend::provider::{AuthProvider, ProfileStore};
use crate::backend::storage::SessionStorage;
use crate::utils::error::BackendError;

struct Account {
    password: String,
    user: User,
}

/// Fake provider + profile table with knobs for failure injection.
#[derive(Default)]
pub struct FakeBackend {
    accounts: Mutex<HashMap<String, Account>>,
    session: Mutex<Option<Session>>,
    profiles: Mutex<HashMap<String, Profile>>,
    events: Mutex<Option<broadcast::Sender<AuthEvent>>>,

    pub inserts: AtomicUsize,
    pub sign_in_calls: AtomicUsize,
    /// Next sign-in fails with this error.
    pub sign_in_error: Mutex<Option<BackendError>>,
    pub fail_sign_out: AtomicBool,
    /// Every profile read fails.
    pub fail_fetch: AtomicBool,
    pub fail_delete: AtomicBool,
    /// `exists` answers false even when the row is there.
    pub hide_existing: AtomicBool,
    /// Number of upcoming inserts that fail with a transient error.
    pub failing_inserts: AtomicUsize,
    /// Number of upcoming `get_session` calls that fail.
    pub failing_sessions: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        let (sender, _) = broadcast::channel(16);
        let backend = Self::default();
        *backend.events.lock().unwrap() = Some(sender);
        Arc::new(backend)
    }

    pub fn add_account(&self, email: &str, password: &str) -> User {
        let user = User {
            id: format!("user-{}", email.replace(['@', '.'], "-")),
            email: Some(email.to_string()),
            created_at: Some(Utc::now()),
        };
        self.accounts.lock().unwrap().insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        user
    }

    pub fn session_for(user: &User) -> Session {
        Session {
            access_token: format!("access-{}", user.id),
            refresh_token: format!("refresh-{}", user.id),
            expires_at: Some(Utc::now().timestamp() + 3600),
            user: user.clone(),
        }
    }

    /// Puts a session in place as if restored from storage; emits nothing.
    pub fn restore_session(&self, user: &User) {
        *self.session.lock().unwrap() = Some(Self::session_for(user));
    }

    pub fn seed_profile(&self, profile: Profile) {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.id.clone(), profile);
    }

    pub fn profile(&self, id: &str) -> Option<Profile> {
        self.profiles.lock().unwrap().get(id).cloned()
    }

    pub fn emit(&self, event: AuthEvent) {
        if let Some(sender) = self.events.lock().unwrap().as_ref() {
            let _ = sender.send(event);
        }
    }

    /// Live subscriptions to the session feed.
    pub fn subscriber_count(&self) -> usize {
        self.events
            .lock()
            .unwrap()
            .as_ref()
            .map_or(0, broadcast::Sender::receiver_count)
    }

    fn unavailable() -> BackendError {
        BackendError::new("service unavailable").with_status(503)
    }
}

#[async_trait]
impl AuthProvider for FakeBackend {
    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        if self
            .failing_sessions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(Self::unavailable());
        }
        Ok(self.session.lock().unwrap().clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events
            .lock()
            .unwrap()
            .as_ref()
            .expect("event feed")
            .subscribe()
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignInData, BackendError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.sign_in_error.lock().unwrap().take() {
            return Err(err);
        }

        let user = {
            let accounts = self.accounts.lock().unwrap();
            match accounts.get(email) {
                Some(account) if account.password == password => account.user.clone(),
                _ => {
                    return Err(BackendError::new("Invalid login credentials")
                        .with_status(400)
                        .with_code("invalid_credentials"));
                }
            }
        };

        let session = Self::session_for(&user);
        *self.session.lock().unwrap() = Some(session.clone());
        self.emit(AuthEvent::SignedIn(session.clone()));
        Ok(SignInData { session, user })
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        *self.session.lock().unwrap() = None;
        self.emit(AuthEvent::SignedOut);
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(())
    }

    async fn get_user(&self) -> Result<Option<User>, BackendError> {
        Ok(self.session.lock().unwrap().as_ref().map(|s| s.user.clone()))
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        _redirect_to: Option<&str>,
    ) -> Result<(), BackendError> {
        if self.accounts.lock().unwrap().contains_key(email) {
            Ok(())
        } else {
            Err(BackendError::new("User not found").with_status(404))
        }
    }
}

#[async_trait]
impl ProfileStore for FakeBackend {
    async fn exists(&self, id: &str) -> Result<bool, BackendError> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        if self.hide_existing.load(Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(self.profiles.lock().unwrap().contains_key(id))
    }

    async fn fetch(&self, id: &str) -> Result<Option<Profile>, BackendError> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(self.profile(id))
    }

    async fn insert(&self, profile: &NewProfile) -> Result<Profile, BackendError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self
            .failing_inserts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(Self::unavailable());
        }

        let mut profiles = self.profiles.lock().unwrap();
        if profiles.contains_key(&profile.id) {
            return Err(
                BackendError::new("duplicate key value violates unique constraint \"profiles_pkey\"")
                    .with_status(409)
                    .with_code("23505"),
            );
        }
        let row = Profile {
            id: profile.id.clone(),
            email: profile.email.clone(),
            nome: profile.nome.clone(),
            role: profile.role,
            created_at: Some(Utc::now()),
        };
        profiles.insert(row.id.clone(), row.clone());
        Ok(row)
    }

    async fn delete(&self, id: &str) -> Result<(), BackendError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(BackendError::new("permission denied").with_code("42501"));
        }
        self.profiles.lock().unwrap().remove(id);
        Ok(())
    }

    async fn count_admins(&self) -> Result<usize, BackendError> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.role == Role::Admin)
            .count())
    }

    async fn set_role(&self, id: &str, role: Role) -> Result<Profile, BackendError> {
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles
            .get_mut(id)
            .ok_or_else(|| BackendError::new("no row"))?;
        profile.role = role;
        Ok(profile.clone())
    }
}

/// Session slot in memory; `fail_clear` simulates unavailable storage.
#[derive(Default)]
pub struct MemorySessionStorage {
    pub slot: Mutex<Option<Session>>,
    pub fail_clear: AtomicBool,
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn load(&self) -> io::Result<Option<Session>> {
        Ok(self.slot.lock().unwrap().clone())
    }

    async fn save(&self, session: &Session) -> io::Result<()> {
        *self.slot.lock().unwrap() = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> io::Result<()> {
        if self.fail_clear.load(Ordering::SeqCst) {
            return Err(io::Error::other("storage unavailable"));
        }
        *self.slot.lock().unwrap() = None;
        Ok(())
    }
}
