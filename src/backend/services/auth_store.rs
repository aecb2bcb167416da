//! Auth state store: the single source of truth for session, user and profile.
//!
//! The store is constructed explicitly and handed to the UI through context.
//! It subscribes once to the provider's session feed, restores any persisted
//! session on [`AuthStore::start`], and runs profile reconciliation whenever a
//! user signs in. Observers get snapshots through a watch channel.
//!
//! Two counters keep late async results from clobbering newer state:
//! `epoch` moves on every session event (so a slow bootstrap that found no
//! session cannot undo a `SIGNED_IN` that arrived meanwhile), and
//! `generation` moves on sign-out and reset (so an in-flight profile load
//! started before either is discarded).

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::backend::models::{AuthEvent, Profile, Role, Session, SignInData, User};
use crate::backend::provider::{AuthProvider, ProfileStore};
use crate::backend::services::cooldown::{
    Cooldown, DEFAULT_COOLDOWN, classify_sign_in_error, is_rate_limit, parse_cooldown,
};
use crate::backend::services::reconciler::ProfileReconciler;
use crate::backend::storage::SessionStorage;
use crate::backend::utils::clock::Clock;
use crate::backend::utils::retry::RetryPolicy;
use crate::utils::error::{AuthError, Result};

/// Combined view consumed by the route guard and the navigation bar.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthState {
    pub session: Option<Session>,
    pub user: Option<User>,
    pub profile: Option<Profile>,
    pub loading: bool,
    pub auth_error: Option<AuthError>,
    /// False until the first bootstrap (or a reset) has finished.
    pub initialized: bool,
}

impl AuthState {
    fn starting() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn role(&self) -> Option<Role> {
        self.profile.as_ref().map(|p| p.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    /// Name for the navigation bar.
    pub fn display_name(&self) -> Option<&str> {
        self.profile
            .as_ref()
            .map(|p| p.nome.as_str())
            .or_else(|| self.user.as_ref().and_then(|u| u.email.as_deref()))
    }
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Profile insert retries.
    pub create_retry: RetryPolicy,
    /// Store-level retries of transient profile read failures.
    pub fetch_retry: RetryPolicy,
    /// Pause before the store reports itself initialized again after a reset.
    pub reset_delay: Duration,
    /// Cooldown when a rate-limit message carries no wait time.
    pub default_cooldown: Duration,
    pub password_reset_redirect: Option<String>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            create_retry: RetryPolicy::fixed(3, Duration::from_secs(1)),
            fetch_retry: RetryPolicy::exponential(
                2,
                Duration::from_millis(500),
                Duration::from_secs(2),
            ),
            reset_delay: Duration::from_millis(500),
            default_cooldown: DEFAULT_COOLDOWN,
            password_reset_redirect: None,
        }
    }
}

struct Inner {
    provider: Arc<dyn AuthProvider>,
    profiles: Arc<dyn ProfileStore>,
    storage: Arc<dyn SessionStorage>,
    reconciler: ProfileReconciler,
    cooldown: Cooldown,
    settings: AuthSettings,
    state: watch::Sender<AuthState>,
    pending: AtomicUsize,
    epoch: AtomicU64,
    generation: AtomicU64,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Ok(slot) = self.listener.get_mut()
            && let Some(handle) = slot.take()
        {
            handle.abort();
        }
    }
}

/// Cheap to clone; all clones share one state.
#[derive(Clone)]
pub struct AuthStore {
    inner: Arc<Inner>,
}

/// Marks an operation in flight; dropping it clears `loading` when it was
/// the last one, whatever path the operation left through.
struct Busy<'a> {
    store: &'a AuthStore,
}

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        self.store.inner.pending.fetch_sub(1, Ordering::SeqCst);
        self.store.refresh_loading();
    }
}

impl AuthStore {
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        profiles: Arc<dyn ProfileStore>,
        storage: Arc<dyn SessionStorage>,
        clock: Arc<dyn Clock>,
        settings: AuthSettings,
    ) -> Self {
        let reconciler =
            ProfileReconciler::new(provider.clone(), profiles.clone(), settings.create_retry);
        let (state, _) = watch::channel(AuthState::starting());

        Self {
            inner: Arc::new(Inner {
                provider,
                profiles,
                storage,
                reconciler,
                cooldown: Cooldown::new(clock),
                settings,
                state,
                pending: AtomicUsize::new(0),
                epoch: AtomicU64::new(0),
                generation: AtomicU64::new(0),
                listener: Mutex::new(None),
            }),
        }
    }

    pub fn snapshot(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    pub fn provider(&self) -> Arc<dyn AuthProvider> {
        self.inner.provider.clone()
    }

    pub fn profiles(&self) -> Arc<dyn ProfileStore> {
        self.inner.profiles.clone()
    }

    /// Time left before another sign-in attempt is allowed.
    pub fn cooldown_remaining(&self) -> Option<Duration> {
        self.inner.cooldown.remaining()
    }

    fn update(&self, f: impl FnOnce(&mut AuthState)) {
        self.inner.state.send_modify(f);
    }

    fn refresh_loading(&self) {
        let busy = self.inner.pending.load(Ordering::SeqCst) > 0;
        self.inner.state.send_if_modified(|state| {
            let loading = busy || !state.initialized;
            let changed = state.loading != loading;
            state.loading = loading;
            changed
        });
    }

    fn busy(&self) -> Busy<'_> {
        self.inner.pending.fetch_add(1, Ordering::SeqCst);
        self.refresh_loading();
        Busy { store: self }
    }

    fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    fn fail<T>(&self, err: AuthError) -> Result<T> {
        log::warn!("Auth operation failed ({}): {err}", err.code());
        self.update(|state| state.auth_error = Some(err.clone()));
        Err(err)
    }

    /// Subscribes to session changes, then restores the persisted session.
    /// Subscribing first means a `SIGNED_IN` racing the bootstrap is never lost.
    pub async fn start(&self) {
        let mut events = self.inner.provider.subscribe();
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);

        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let Some(inner) = weak.upgrade() else { break };
                        let store = AuthStore { inner };
                        store.handle_event(event).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!("Session feed lagged, {skipped} events skipped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            log::debug!("Session feed listener stopped");
        });

        if let Ok(mut slot) = self.inner.listener.lock()
            && let Some(previous) = slot.replace(handle)
        {
            previous.abort();
        }

        self.bootstrap().await;
    }

    /// Stops listening to the session feed.
    pub fn shutdown(&self) {
        if let Ok(mut slot) = self.inner.listener.lock()
            && let Some(handle) = slot.take()
        {
            handle.abort();
        }
    }

    async fn bootstrap(&self) {
        let busy = self.busy();
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        let generation = self.generation();

        match self.inner.provider.get_session().await {
            Ok(Some(session)) if self.inner.epoch.load(Ordering::SeqCst) == epoch => {
                log::info!("Restored session for {}", session.user.id);
                let user_id = session.user.id.clone();
                self.apply_session(session);
                // Settled enough for the guard; the profile load below keeps `loading` up
                self.update(|state| state.initialized = true);
                let _ = self.load_profile(&user_id, generation).await;
            }
            Ok(Some(_)) => log::debug!("Session event arrived during bootstrap, keeping it"),
            Ok(None) => log::debug!("No persisted session"),
            Err(e) => {
                log::warn!("Could not restore session: {e}");
                self.update(|state| state.auth_error = Some(AuthError::SessionInvalid(e.message)));
            }
        }

        self.update(|state| state.initialized = true);
        drop(busy);
    }

    /// Asks the provider for the live session and adopts it if the state
    /// does not know it yet, e.g. after a bootstrap that failed transiently.
    /// Returns once the profile load for an adopted session has finished.
    pub async fn sync_session(&self) -> Option<Session> {
        let _busy = self.busy();
        let generation = self.generation();

        let session = match self.inner.provider.get_session().await {
            Ok(Some(session)) => session,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Session check failed: {e}");
                return None;
            }
        };

        let known = self
            .snapshot()
            .user
            .is_some_and(|u| u.id == session.user.id);
        if !known {
            log::info!("Adopting live session for {}", session.user.id);
            let user_id = session.user.id.clone();
            self.apply_session(session.clone());
            self.update(|state| {
                state.auth_error = None;
                state.initialized = true;
            });
            let _ = self.load_profile(&user_id, generation).await;
        }
        Some(session)
    }

    async fn handle_event(&self, event: AuthEvent) {
        log::debug!("Handling {}", event.name());
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);

        match event {
            AuthEvent::SignedIn(session) => {
                let _busy = self.busy();
                let generation = self.generation();
                let user_id = session.user.id.clone();
                self.apply_session(session);
                let _ = self.load_profile(&user_id, generation).await;
            }
            AuthEvent::TokenRefreshed(session) => self.apply_session(session),
            AuthEvent::SignedOut => self.update(|state| {
                state.session = None;
                state.user = None;
                state.profile = None;
                state.auth_error = None;
            }),
        }
    }

    fn apply_session(&self, session: Session) {
        self.update(|state| {
            let same_user = state.user.as_ref().is_some_and(|u| u.id == session.user.id);
            if !same_user {
                state.profile = None;
            }
            state.user = Some(session.user.clone());
            state.session = Some(session);
        });
    }

    /// Runs the reconciler and publishes the outcome unless the state was
    /// reset or signed out since `generation` was taken.
    async fn load_profile(&self, user_id: &str, generation: u64) -> Result<Profile> {
        let result = self
            .inner
            .settings
            .fetch_retry
            .run_if(
                |_| self.inner.reconciler.fetch_profile(user_id),
                AuthError::is_transient,
            )
            .await;

        if self.generation() != generation {
            log::debug!("Discarding profile result for {user_id}, auth state changed");
            return result;
        }

        match &result {
            Ok(profile) => self.update(|state| {
                if state.user.as_ref().is_some_and(|u| u.id == profile.id) {
                    state.profile = Some(profile.clone());
                    state.auth_error = None;
                }
            }),
            Err(e) => {
                log::warn!("Profile load for {user_id} failed: {e}");
                self.update(|state| state.auth_error = Some(e.clone()));
            }
        }
        result
    }

    /// Password sign-in. The profile is loaded by the `SIGNED_IN` event.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignInData> {
        let _busy = self.busy();

        if let Err(e) = self.inner.cooldown.check() {
            log::info!("Sign-in blocked locally: {e}");
            return Err(e);
        }

        match self
            .inner
            .provider
            .sign_in_with_password(email.trim(), password)
            .await
        {
            Ok(data) => {
                log::info!("Signed in as {}", data.user.id);
                self.inner.cooldown.clear();
                self.apply_session(data.session.clone());
                self.update(|state| state.auth_error = None);
                Ok(data)
            }
            Err(e) => {
                let err = classify_sign_in_error(&e, self.inner.settings.default_cooldown);
                if let AuthError::RateLimited { cooldown } = &err {
                    self.inner.cooldown.arm(*cooldown);
                }
                self.fail(err)
            }
        }
    }

    /// Ends the local session. Provider or storage failures are logged and
    /// otherwise ignored: the local state is cleared regardless.
    pub async fn sign_out(&self) {
        let _busy = self.busy();
        self.inner.generation.fetch_add(1, Ordering::SeqCst);

        self.update(|state| {
            state.profile = None;
            state.user = None;
            state.session = None;
        });

        if let Err(e) = self.inner.provider.sign_out().await {
            log::warn!("Provider sign-out failed, local session cleared anyway: {e}");
        }
        if let Err(e) = self.inner.storage.clear().await {
            log::warn!("Could not clear persisted session: {e}");
        }

        self.update(|state| state.auth_error = None);
        log::info!("Signed out");
    }

    /// Re-validates the session and runs reconciliation again for the
    /// current user.
    pub async fn retry_profile_fetch(&self) -> Result<Profile> {
        let _busy = self.busy();
        let generation = self.generation();

        let Some(user) = self.snapshot().user else {
            return self.fail(AuthError::NotAuthenticated);
        };

        match self.inner.provider.get_session().await {
            Ok(Some(session)) if session.user.id == user.id => self.apply_session(session),
            Ok(Some(session)) => {
                return self.fail(AuthError::SessionInvalid(format!(
                    "session belongs to {}",
                    session.user.id
                )));
            }
            Ok(None) => return self.fail(AuthError::SessionInvalid("no active session".into())),
            Err(e) => return self.fail(AuthError::SessionInvalid(e.message)),
        }

        self.update(|state| state.auth_error = None);
        self.load_profile(&user.id, generation).await
    }

    /// Hard reset for wedged states that a plain sign-out does not clear.
    pub async fn reset_auth_state(&self) {
        log::info!("Resetting auth state");
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.update(|state| {
            *state = AuthState {
                loading: true,
                ..AuthState::default()
            };
        });

        if let Err(e) = self.inner.provider.sign_out().await {
            log::debug!("Forced sign-out during reset failed: {e}");
        }
        if let Err(e) = self.inner.storage.clear().await {
            log::warn!("Could not clear persisted session during reset: {e}");
        }

        // Let in-flight operations observe the new generation before new work starts
        tokio::time::sleep(self.inner.settings.reset_delay).await;
        self.update(|state| state.initialized = true);
        self.refresh_loading();
    }

    /// Requests a password-reset email.
    pub async fn reset_password(&self, email: &str) -> Result<()> {
        self.inner.cooldown.check()?;

        let redirect = self.inner.settings.password_reset_redirect.as_deref();
        match self
            .inner
            .provider
            .reset_password_for_email(email.trim(), redirect)
            .await
        {
            Ok(()) => {
                log::info!("Password reset requested");
                Ok(())
            }
            Err(e) if is_rate_limit(&e) => {
                let cooldown =
                    parse_cooldown(&e.message).unwrap_or(self.inner.settings.default_cooldown);
                self.inner.cooldown.arm(cooldown);
                Err(AuthError::RateLimited { cooldown })
            }
            Err(e) => {
                log::warn!("Password reset request failed: {e}");
                Err(AuthError::Provider(e.message))
            }
        }
    }

    /// Replaces the cached profile after an out-of-band update of the
    /// current user's row.
    pub(crate) fn replace_profile(&self, profile: Profile) {
        self.update(|state| {
            if state.user.as_ref().is_some_and(|u| u.id == profile.id) {
                state.profile = Some(profile);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::services::guard::{
        GuardSettings, GuardView, LoadingStage, RedirectTarget, RouteGuard, authorize, leaves_login,
    };
    use crate::backend::testing::{FakeBackend, MemorySessionStorage};
    use crate::backend::utils::clock::ManualClock;
    use crate::utils::error::BackendError;

    struct Harness {
        backend: Arc<FakeBackend>,
        storage: Arc<MemorySessionStorage>,
        clock: Arc<ManualClock>,
        store: AuthStore,
    }

    fn harness() -> Harness {
        let backend = FakeBackend::new();
        let storage = Arc::new(MemorySessionStorage::default());
        let clock = Arc::new(ManualClock::new());
        let store = AuthStore::new(
            backend.clone(),
            backend.clone(),
            storage.clone(),
            clock.clone(),
            AuthSettings::default(),
        );
        Harness {
            backend,
            storage,
            clock,
            store,
        }
    }

    async fn wait_until(store: &AuthStore, done: impl FnMut(&AuthState) -> bool) -> AuthState {
        let mut rx = store.subscribe();
        let state = tokio::time::timeout(Duration::from_secs(30), rx.wait_for(done))
            .await
            .expect("state never settled")
            .expect("store dropped");
        state.clone()
    }

    #[tokio::test(start_paused = true)]
    async fn first_sign_in_creates_professor_profile() {
        let h = harness();
        h.backend.add_account("prof@example.com", "secret");
        h.store.start().await;
        assert!(!h.store.snapshot().loading);

        h.store.sign_in("prof@example.com", "secret").await.unwrap();
        let state = wait_until(&h.store, |s| s.profile.is_some() && !s.loading).await;

        let profile = state.profile.clone().unwrap();
        assert_eq!(profile.email, "prof@example.com");
        assert_eq!(profile.nome, "prof");
        assert_eq!(profile.role, Role::Professor);
        assert!(state.is_authenticated());
        assert!(!state.is_admin());
        assert_eq!(authorize(&state, None, "/painel"), GuardView::Authorized);
        assert_eq!(
            authorize(&state, Some(Role::Admin), "/admin"),
            GuardView::Redirect(RedirectTarget::Panel)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn persisted_session_is_restored_on_start() {
        let h = harness();
        let user = h.backend.add_account("boss@example.com", "secret");
        h.backend.restore_session(&user);
        h.backend.seed_profile(Profile {
            id: user.id.clone(),
            email: "boss@example.com".into(),
            nome: "boss".into(),
            role: Role::Admin,
            created_at: None,
        });

        h.store.start().await;

        let state = h.store.snapshot();
        assert!(state.initialized);
        assert!(!state.loading);
        assert!(state.is_admin());
        assert_eq!(state.session.map(|s| s.user.id), Some(user.id));
    }

    #[tokio::test(start_paused = true)]
    async fn sign_in_event_after_empty_bootstrap_still_populates() {
        let h = harness();
        let user = h.backend.add_account("prof@example.com", "secret");
        h.store.start().await;
        assert!(!h.store.snapshot().is_authenticated());

        // Signed in by another window sharing the provider
        h.backend
            .sign_in_with_password("prof@example.com", "secret")
            .await
            .unwrap();

        let state = wait_until(&h.store, |s| s.profile.is_some()).await;
        assert_eq!(state.user.map(|u| u.id), Some(user.id));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_credentials_do_not_touch_profile() {
        let h = harness();
        h.backend.add_account("prof@example.com", "secret");
        h.store.start().await;

        let err = h.store.sign_in("prof@example.com", "wrong").await.unwrap_err();

        assert_eq!(err, AuthError::InvalidCredentials);
        let state = h.store.snapshot();
        assert_eq!(state.profile, None);
        assert_eq!(state.auth_error, Some(AuthError::InvalidCredentials));
        assert!(!state.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn sign_out_clears_state_even_if_provider_fails() {
        let h = harness();
        h.backend.add_account("prof@example.com", "secret");
        h.store.start().await;
        h.store.sign_in("prof@example.com", "secret").await.unwrap();
        wait_until(&h.store, |s| s.profile.is_some()).await;

        h.backend.fail_sign_out.store(true, Ordering::SeqCst);
        h.storage.fail_clear.store(true, Ordering::SeqCst);
        h.store.sign_out().await;

        let state = h.store.snapshot();
        assert!(!state.is_authenticated());
        assert_eq!(state.profile, None);
        assert_eq!(state.auth_error, None);
        assert!(!state.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_cooldown_blocks_resubmission_locally() {
        let h = harness();
        h.backend.add_account("prof@example.com", "secret");
        h.store.start().await;
        *h.backend.sign_in_error.lock().unwrap() = Some(
            BackendError::new("For security purposes, you can only request this after 12 seconds.")
                .with_status(429)
                .with_code("over_request_rate_limit"),
        );

        let err = h.store.sign_in("prof@example.com", "secret").await.unwrap_err();
        assert_eq!(
            err,
            AuthError::RateLimited {
                cooldown: Duration::from_secs(12)
            }
        );

        h.clock.advance(Duration::from_secs(5));
        let err = h.store.sign_in("prof@example.com", "secret").await.unwrap_err();
        assert_eq!(
            err,
            AuthError::CoolingDown {
                remaining: Duration::from_secs(7)
            }
        );
        assert_eq!(h.backend.sign_in_calls.load(Ordering::SeqCst), 1);
        assert!(!h.store.snapshot().loading);

        h.clock.advance(Duration::from_secs(7));
        h.store.sign_in("prof@example.com", "secret").await.unwrap();
        assert_eq!(h.backend.sign_in_calls.load(Ordering::SeqCst), 2);
        assert_eq!(h.store.cooldown_remaining(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_recovers_from_a_wedged_profile_fetch() {
        let h = harness();
        h.backend.add_account("prof@example.com", "secret");
        h.store.start().await;
        h.backend.fail_fetch.store(true, Ordering::SeqCst);

        h.store.sign_in("prof@example.com", "secret").await.unwrap();
        let wedged = wait_until(&h.store, |s| s.auth_error.is_some() && !s.loading).await;
        assert!(wedged.is_authenticated());
        assert_eq!(wedged.profile, None);

        h.store.reset_auth_state().await;
        let state = h.store.snapshot();
        assert_eq!(state.session, None);
        assert_eq!(state.user, None);
        assert_eq!(state.profile, None);
        assert_eq!(state.auth_error, None);
        assert!(state.initialized);
        assert!(!state.loading);

        h.backend.fail_fetch.store(false, Ordering::SeqCst);
        h.store.sign_in("prof@example.com", "secret").await.unwrap();
        let state = wait_until(&h.store, |s| s.profile.is_some()).await;
        assert_eq!(state.profile.map(|p| p.nome), Some("prof".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_requires_a_user() {
        let h = harness();
        h.store.start().await;

        let err = h.store.retry_profile_fetch().await.unwrap_err();

        assert_eq!(err, AuthError::NotAuthenticated);
        assert_eq!(h.store.snapshot().auth_error, Some(AuthError::NotAuthenticated));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_detects_a_dead_session() {
        let h = harness();
        h.backend.add_account("prof@example.com", "secret");
        h.store.start().await;
        h.store.sign_in("prof@example.com", "secret").await.unwrap();
        wait_until(&h.store, |s| s.profile.is_some()).await;

        // Provider forgot the session without telling us
        h.store.shutdown();
        let _ = h.backend.sign_out().await;

        let err = h.store.retry_profile_fetch().await.unwrap_err();
        assert!(matches!(err, AuthError::SessionInvalid(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_recovers_once_the_backend_does() {
        let h = harness();
        h.backend.add_account("prof@example.com", "secret");
        h.store.start().await;
        h.backend.fail_fetch.store(true, Ordering::SeqCst);
        h.store.sign_in("prof@example.com", "secret").await.unwrap();
        wait_until(&h.store, |s| s.auth_error.is_some() && !s.loading).await;

        h.backend.fail_fetch.store(false, Ordering::SeqCst);
        let profile = h.store.retry_profile_fetch().await.unwrap();

        let state = h.store.snapshot();
        assert_eq!(state.profile, Some(profile));
        assert_eq!(state.auth_error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn password_reset_reports_unknown_accounts() {
        let h = harness();
        h.backend.add_account("prof@example.com", "secret");

        h.store.reset_password("prof@example.com").await.unwrap();
        assert!(matches!(
            h.store.reset_password("nobody@example.com").await,
            Err(AuthError::Provider(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_profile_load_leaves_login_for_the_recovery_panel() {
        let h = harness();
        h.backend.add_account("prof@example.com", "secret");
        h.store.start().await;
        h.backend.fail_fetch.store(true, Ordering::SeqCst);

        h.store.sign_in("prof@example.com", "secret").await.unwrap();
        let state = wait_until(&h.store, |s| s.auth_error.is_some() && !s.loading).await;
        assert_eq!(state.profile, None);
        assert!(leaves_login(&state));

        let mut guard = RouteGuard::new(true, None, h.clock.clone(), GuardSettings::default());
        guard.mark_session_verified();
        assert_eq!(guard.view(&state, "/painel"), GuardView::Loading(LoadingStage::Spinner));
        h.clock.advance(Duration::from_secs(3));
        assert_eq!(guard.view(&state, "/painel"), GuardView::Loading(LoadingStage::SlowPanel));
        h.clock.advance(Duration::from_secs(7));
        assert_eq!(
            guard.view(&state, "/painel"),
            GuardView::Loading(LoadingStage::Diagnostics)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn guard_session_check_adopts_a_session_bootstrap_missed() {
        let h = harness();
        let user = h.backend.add_account("boss@example.com", "secret");
        h.backend.restore_session(&user);
        h.backend.seed_profile(Profile {
            id: user.id.clone(),
            email: "boss@example.com".into(),
            nome: "boss".into(),
            role: Role::Admin,
            created_at: None,
        });
        h.backend.failing_sessions.store(1, Ordering::SeqCst);

        h.store.start().await;
        let missed = h.store.snapshot();
        assert_eq!(missed.user, None);
        assert!(matches!(missed.auth_error, Some(AuthError::SessionInvalid(_))));

        let mut guard =
            RouteGuard::new(true, Some(Role::Admin), h.clock.clone(), GuardSettings::default());
        assert_eq!(guard.view(&missed, "/admin"), GuardView::VerifyingSession);

        let session = h.store.sync_session().await;
        guard.mark_session_verified();

        assert_eq!(session.map(|s| s.user.id), Some(user.id.clone()));
        let state = h.store.snapshot();
        assert_eq!(state.user.as_ref().map(|u| u.id.clone()), Some(user.id));
        assert_eq!(state.auth_error, None);
        assert!(!state.loading);
        assert!(state.is_admin());
        assert_eq!(guard.view(&h.store.snapshot(), "/admin"), GuardView::Authorized);
    }

    #[tokio::test(start_paused = true)]
    async fn session_check_leaves_a_known_session_alone() {
        let h = harness();
        h.backend.add_account("prof@example.com", "secret");
        h.store.start().await;
        assert_eq!(h.store.sync_session().await, None);

        h.store.sign_in("prof@example.com", "secret").await.unwrap();
        let before = wait_until(&h.store, |s| s.profile.is_some() && !s.loading).await;
        let inserts = h.backend.inserts.load(Ordering::SeqCst);

        assert!(h.store.sync_session().await.is_some());
        assert_eq!(h.store.snapshot().profile, before.profile);
        assert_eq!(h.backend.inserts.load(Ordering::SeqCst), inserts);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_completes_even_if_storage_cannot_be_cleared() {
        let h = harness();
        h.backend.add_account("prof@example.com", "secret");
        h.store.start().await;
        h.store.sign_in("prof@example.com", "secret").await.unwrap();
        wait_until(&h.store, |s| s.profile.is_some() && !s.loading).await;
        h.storage.fail_clear.store(true, Ordering::SeqCst);

        h.store.reset_auth_state().await;

        let state = h.store.snapshot();
        assert_eq!(state.session, None);
        assert_eq!(state.user, None);
        assert_eq!(state.profile, None);
        assert_eq!(state.auth_error, None);
        assert!(state.initialized);
        assert!(!state.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_listening_to_the_session_feed() {
        let h = harness();
        let user = h.backend.add_account("prof@example.com", "secret");
        h.store.start().await;
        assert_eq!(h.backend.subscriber_count(), 1);

        h.store.shutdown();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(h.backend.subscriber_count(), 0);

        h.backend.emit(AuthEvent::SignedIn(FakeBackend::session_for(&user)));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(h.store.snapshot().user, None);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_store_stops_listening_to_the_session_feed() {
        let Harness { backend, store, .. } = harness();
        store.start().await;
        assert_eq!(backend.subscriber_count(), 1);

        drop(store);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(backend.subscriber_count(), 0);
    }
}
