//! Error handling.

use std::time::Duration;

use thiserror::Error;

/// PostgreSQL `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Error reported by the hosted backend (auth provider or the `profiles` table).
///
/// Carries whatever the backend told us: the HTTP status, its machine-readable
/// code and the human message. Classification into [`AuthError`] happens at
/// the call site that knows what the request was for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// The row already exists (primary key or unique constraint hit).
    pub fn is_duplicate_key(&self) -> bool {
        self.code.as_deref() == Some(UNIQUE_VIOLATION)
            || self.message.to_lowercase().contains("duplicate key")
    }

    /// The backend rejected our credentials or token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status, Some(401 | 403))
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        Self {
            status,
            code: None,
            message: format!("HTTP error: {err}"),
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("JSON error: {err}"))
    }
}

/// Everything the auth layer can surface to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("backend connection settings are missing")]
    NotConfigured,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("email address has not been confirmed")]
    EmailNotConfirmed,
    #[error("too many attempts, try again in {} seconds", .cooldown.as_secs())]
    RateLimited { cooldown: Duration },
    #[error("please wait {} seconds before trying again", whole_seconds(.remaining))]
    CoolingDown { remaining: Duration },
    #[error("no authenticated user")]
    NotAuthenticated,
    #[error("session is no longer valid: {0}")]
    SessionInvalid(String),
    #[error("failed to fetch profile: {0}")]
    ProfileFetch(String),
    #[error("profile exists but no data was returned")]
    EmptyProfileData,
    #[error("failed to create profile: {0}")]
    ProfileCreationFailed(String),
    #[error("failed to update profile: {0}")]
    ProfileUpdateFailed(String),
    #[error("first access is closed, an administrator already exists")]
    FirstAccessClosed,
    #[error("{0}")]
    Provider(String),
}

impl AuthError {
    /// Stable code for logs and the diagnostic panel.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotConfigured => "not_configured",
            Self::InvalidCredentials => "invalid_credentials",
            Self::EmailNotConfirmed => "email_not_confirmed",
            Self::RateLimited { .. } => "rate_limited",
            Self::CoolingDown { .. } => "cooling_down",
            Self::NotAuthenticated => "not_authenticated",
            Self::SessionInvalid(_) => "session_invalid",
            Self::ProfileFetch(_) => "profile_fetch_error",
            Self::EmptyProfileData => "empty_profile_data",
            Self::ProfileCreationFailed(_) => "profile_creation_failed",
            Self::ProfileUpdateFailed(_) => "profile_update_failed",
            Self::FirstAccessClosed => "first_access_closed",
            Self::Provider(_) => "unknown",
        }
    }

    /// Failures worth another attempt by a caller that owns a retry policy.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::ProfileFetch(_) | Self::EmptyProfileData)
    }
}

/// Rounds up so a 200ms wait is never shown as "0 seconds".
pub fn whole_seconds(duration: &Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

pub type Result<T, E = AuthError> = std::result::Result<T, E>;
