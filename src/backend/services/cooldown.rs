//! Sign-in throttling after provider rate limits.

use std::sync::{Arc, LazyLock, Mutex};
use std::time::{Duration, Instant};

use regex::Regex;

use crate::backend::utils::clock::Clock;
use crate::utils::error::{AuthError, BackendError};

/// Used when the provider's message carries no usable wait time.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

/// Provider error codes that mean "slow down".
const RATE_LIMIT_CODES: &[&str] = &[
    "over_request_rate_limit",
    "over_email_send_rate_limit",
    "over_sms_send_rate_limit",
];

static WAIT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*seconds?").expect("wait pattern is valid"));

/// Structured signals first (code, HTTP 429); message text only as fallback.
pub fn is_rate_limit(err: &BackendError) -> bool {
    if err
        .code
        .as_deref()
        .is_some_and(|code| RATE_LIMIT_CODES.contains(&code))
        || err.status == Some(429)
    {
        return true;
    }

    let message = err.message.to_lowercase();
    message.contains("rate limit") || message.contains("for security purposes")
}

/// Extracts "N seconds" from a provider message.
pub fn parse_cooldown(message: &str) -> Option<Duration> {
    WAIT_PATTERN
        .captures(message)
        .and_then(|caps| caps.get(1))
        .and_then(|secs| secs.as_str().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

/// Classifies a failed password sign-in.
pub fn classify_sign_in_error(err: &BackendError, fallback: Duration) -> AuthError {
    if is_rate_limit(err) {
        return AuthError::RateLimited {
            cooldown: parse_cooldown(&err.message).unwrap_or(fallback),
        };
    }

    match err.code.as_deref() {
        Some("invalid_credentials") => return AuthError::InvalidCredentials,
        Some("email_not_confirmed") => return AuthError::EmailNotConfirmed,
        _ => {}
    }

    let message = err.message.to_lowercase();
    if message.contains("invalid login credentials") {
        AuthError::InvalidCredentials
    } else if message.contains("email not confirmed") {
        AuthError::EmailNotConfirmed
    } else {
        AuthError::Provider(err.message.clone())
    }
}

/// Locally enforced waiting period.
pub struct Cooldown {
    clock: Arc<dyn Clock>,
    until: Mutex<Option<Instant>>,
}

impl Cooldown {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            until: Mutex::new(None),
        }
    }

    pub fn arm(&self, duration: Duration) {
        let until = self.clock.now() + duration;
        if let Ok(mut slot) = self.until.lock() {
            // Never shorten a longer wait that is already running
            if slot.is_none_or(|current| current < until) {
                *slot = Some(until);
            }
        }
    }

    pub fn clear(&self) {
        if let Ok(mut slot) = self.until.lock() {
            *slot = None;
        }
    }

    /// Time left, or `None` once the cooldown is over.
    pub fn remaining(&self) -> Option<Duration> {
        let now = self.clock.now();
        let mut slot = self.until.lock().ok()?;
        match *slot {
            Some(until) if until > now => Some(until - now),
            Some(_) => {
                *slot = None;
                None
            }
            None => None,
        }
    }

    /// Rejects the attempt while the cooldown runs.
    pub fn check(&self) -> Result<(), AuthError> {
        match self.remaining() {
            Some(remaining) => Err(AuthError::CoolingDown { remaining }),
            None => Ok(()),
        }
    }
}
