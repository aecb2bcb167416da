//! Backend connection settings.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::backend::utils::paths::app_dir_or_local;

/// Environment variable overriding [`BackendConfig::url`].
pub const URL_ENV: &str = "ACADEMIA_BACKEND_URL";
/// Environment variable overriding [`BackendConfig::anon_key`].
pub const ANON_KEY_ENV: &str = "ACADEMIA_BACKEND_ANON_KEY";
/// Environment variable overriding [`BackendConfig::password_reset_redirect`].
pub const RESET_REDIRECT_ENV: &str = "ACADEMIA_PASSWORD_RESET_REDIRECT";

const DEFAULT_STORAGE_KEY: &str = "sb-academia-auth-token";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub url: Option<String>,
    /// Public (anon) API key.
    pub anon_key: Option<String>,
    /// Name of the persisted session slot.
    pub storage_key: String,
    /// Where password-reset emails send the user back to.
    pub password_reset_redirect: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            password_reset_redirect: None,
        }
    }
}

impl BackendConfig {
    /// Reads `config.json` from the application directory, then applies
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let path = app_dir_or_local().join("config.json");
        let mut config = Self::load_file(&path)?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Missing file means defaults; a malformed one is an error.
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(URL_ENV) {
            self.url = Some(url);
        }
        if let Some(key) = lookup(ANON_KEY_ENV) {
            self.anon_key = Some(key);
        }
        if let Some(redirect) = lookup(RESET_REDIRECT_ENV) {
            self.password_reset_redirect = Some(redirect);
        }
    }

    /// URL without the trailing slash, if set and non-blank.
    pub fn base_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .map(|url| url.trim().trim_end_matches('/'))
            .filter(|url| !url.is_empty())
    }

    pub fn key(&self) -> Option<&str> {
        self.anon_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn is_configured(&self) -> bool {
        self.base_url().is_some() && self.key().is_some()
    }
}
