//! Route guard decisions, independent of the UI toolkit.
//!
//! The guard is re-evaluated on every state change; nothing here caches an
//! authorization decision. Loading escalation is driven by an injected
//! [`Clock`] and only changes what is displayed, never the work in flight.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::backend::models::Role;
use crate::backend::services::auth_store::AuthState;
use crate::backend::utils::clock::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardSettings {
    /// Offer Retry / Reset / Force logout after this long.
    pub loading_timeout: Duration,
    /// Also show the last error and the database check after this long.
    pub long_loading_timeout: Duration,
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self {
            loading_timeout: Duration::from_secs(3),
            long_loading_timeout: Duration::from_secs(10),
        }
    }
}

impl GuardSettings {
    pub fn stage_for(&self, elapsed: Duration) -> LoadingStage {
        if elapsed >= self.long_loading_timeout {
            LoadingStage::Diagnostics
        } else if elapsed >= self.loading_timeout {
            LoadingStage::SlowPanel
        } else {
            LoadingStage::Spinner
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoadingStage {
    Spinner,
    SlowPanel,
    Diagnostics,
}

impl LoadingStage {
    pub fn offers_recovery(self) -> bool {
        self >= Self::SlowPanel
    }

    pub fn shows_diagnostics(self) -> bool {
        self == Self::Diagnostics
    }
}

/// Tracks how long the store has been settling.
pub struct LoadingEscalation {
    clock: Arc<dyn Clock>,
    settings: GuardSettings,
    started: Option<Instant>,
}

impl LoadingEscalation {
    pub fn new(clock: Arc<dyn Clock>, settings: GuardSettings) -> Self {
        Self {
            clock,
            settings,
            started: None,
        }
    }

    /// Stage to display, or `None` when not loading. The timer restarts
    /// every time loading begins again.
    pub fn observe(&mut self, loading: bool) -> Option<LoadingStage> {
        if !loading {
            self.started = None;
            return None;
        }
        let now = self.clock.now();
        let started = *self.started.get_or_insert(now);
        Some(self.settings.stage_for(now.duration_since(started)))
    }
}

/// Where a blocked visitor is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    /// Login, remembering the requested location.
    Login { from: String },
    /// Default authenticated landing page.
    Panel,
}

impl RedirectTarget {
    pub fn path(&self) -> String {
        match self {
            Self::Login { from } if from.is_empty() => "/login".to_string(),
            Self::Login { from } => format!("/login?from={from}"),
            Self::Panel => "/painel".to_string(),
        }
    }
}

/// What the guard displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardView {
    /// Backend settings missing; terminal.
    ConfigError,
    VerifyingSession,
    Loading(LoadingStage),
    Redirect(RedirectTarget),
    Authorized,
}

/// Still waiting on the store: an operation is running, or a user is known
/// but has no profile. A failed profile load stays here so the escalating
/// panel can offer recovery.
pub fn is_settling(state: &AuthState) -> bool {
    state.loading || !state.initialized || (state.user.is_some() && state.profile.is_none())
}

/// The login page hands over to the guard as soon as a session exists,
/// whether or not the profile made it.
pub fn leaves_login(state: &AuthState) -> bool {
    state.is_authenticated()
}

/// Decision for a settled state. Under-privileged users are sent to the
/// panel, not shown a forbidden page.
pub fn authorize(state: &AuthState, required_role: Option<Role>, requested: &str) -> GuardView {
    if !state.is_authenticated() {
        return GuardView::Redirect(RedirectTarget::Login {
            from: requested.to_string(),
        });
    }

    match required_role {
        None => GuardView::Authorized,
        Some(role) if state.role() == Some(role) => GuardView::Authorized,
        Some(role) => {
            log::info!(
                "{} lacks role {role} for {requested}, redirecting to panel",
                state.user.as_ref().map_or("unknown user", |u| u.id.as_str())
            );
            GuardView::Redirect(RedirectTarget::Panel)
        }
    }
}

/// Where the root route sends a visitor once the store has settled.
pub fn landing_path(state: &AuthState) -> Option<&'static str> {
    if leaves_login(state) {
        Some("/painel")
    } else if is_settling(state) {
        None
    } else {
        Some("/login")
    }
}

/// Location to return to after signing in. Only in-app absolute paths are
/// honoured; anything else lands on the panel.
pub fn return_path(from: &str) -> String {
    let from = from.trim();
    if from.starts_with('/') && !from.starts_with("//") && !from.starts_with("/login") && from != "/"
    {
        from.to_string()
    } else {
        "/painel".to_string()
    }
}

/// Guard for one protected subtree.
pub struct RouteGuard {
    configured: bool,
    session_verified: bool,
    required_role: Option<Role>,
    escalation: LoadingEscalation,
}

impl RouteGuard {
    pub fn new(
        configured: bool,
        required_role: Option<Role>,
        clock: Arc<dyn Clock>,
        settings: GuardSettings,
    ) -> Self {
        Self {
            configured,
            session_verified: false,
            required_role,
            escalation: LoadingEscalation::new(clock, settings),
        }
    }

    /// The independent session check done on mount has finished.
    pub fn mark_session_verified(&mut self) {
        self.session_verified = true;
    }

    pub fn view(&mut self, state: &AuthState, requested: &str) -> GuardView {
        if !self.configured {
            return GuardView::ConfigError;
        }
        if !self.session_verified {
            return GuardView::VerifyingSession;
        }
        if let Some(stage) = self.escalation.observe(is_settling(state)) {
            return GuardView::Loading(stage);
        }
        authorize(state, self.required_role, requested)
    }
}
