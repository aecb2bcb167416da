//! Application services and authentication context.

use std::sync::Arc;

use crate::backend::HostedBackend;
use crate::backend::services::{AuthSettings, AuthState, AuthStore, GuardSettings};
use crate::backend::storage::{FileSessionStorage, SessionStorage};
use crate::backend::utils::clock::{Clock, SystemClock};
use crate::backend::utils::config::BackendConfig;
use crate::backend::utils::paths::app_dir_or_local;
use crate::utils::error::AuthError;
use dioxus::prelude::*;

/// Long-lived services, built once when the window opens.
#[derive(Clone)]
pub struct AppServices {
    /// `None` when the backend connection settings are missing.
    pub store: Option<AuthStore>,
    pub clock: Arc<dyn Clock>,
    pub guard: GuardSettings,
}

impl AppServices {
    pub fn initialize() -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let config = BackendConfig::load().unwrap_or_else(|e| {
            log::error!("Failed to load backend config: {e:#}");
            let mut config = BackendConfig::default();
            config.apply_env(|name| std::env::var(name).ok());
            config
        });

        let storage: Arc<dyn SessionStorage> =
            Arc::new(FileSessionStorage::new(&app_dir_or_local(), &config.storage_key));

        let store = match HostedBackend::new(&config, storage.clone()) {
            Ok(backend) => {
                let backend = Arc::new(backend);
                let settings = AuthSettings {
                    password_reset_redirect: config.password_reset_redirect.clone(),
                    ..AuthSettings::default()
                };
                Some(AuthStore::new(
                    backend.clone(),
                    backend,
                    storage,
                    clock.clone(),
                    settings,
                ))
            }
            Err(AuthError::NotConfigured) => {
                log::error!("Backend URL or anon key missing, running without a backend");
                None
            }
            Err(e) => {
                log::error!("Failed to create backend client: {e}");
                None
            }
        };

        Self {
            store,
            clock,
            guard: GuardSettings::default(),
        }
    }

    pub const fn is_configured(&self) -> bool {
        self.store.is_some()
    }
}

/// Reactive mirror of the store state.
#[derive(Clone, Copy)]
pub struct AuthContext {
    pub state: Signal<AuthState>,
}

impl AuthContext {
    /// Name shown in the navigation bar, or "Usuário" as default.
    pub fn display_name(&self) -> String {
        self.state
            .read()
            .display_name()
            .map_or_else(|| "Usuário".to_string(), str::to_string)
    }

    pub fn user_id(&self) -> Option<String> {
        self.state.read().user.as_ref().map(|u| u.id.clone())
    }
}
