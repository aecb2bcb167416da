//! HTTP client for the hosted backend (GoTrue-style auth + PostgREST tables).

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::broadcast;

use crate::backend::models::{AuthEvent, NewProfile, Profile, Role, Session, SignInData, User};
use crate::backend::provider::{AuthProvider, ProfileStore};
use crate::backend::storage::SessionStorage;
use crate::backend::utils::config::BackendConfig;
use crate::utils::error::{AuthError, BackendError};

const PROFILES_TABLE: &str = "profiles";
const EVENT_CAPACITY: usize = 16;

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| Utc::now().timestamp() + secs));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// Union of the error shapes the auth server and PostgREST send back.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    #[allow(dead_code)]
    id: String,
}

/// Builds a [`BackendError`] from a non-2xx response body.
fn parse_error(status: u16, body: &str) -> BackendError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = parsed
        .error_code
        .or(match parsed.code {
            Some(Value::String(code)) => Some(code),
            _ => None,
        })
        .or(parsed.error);
    let message = parsed
        .msg
        .or(parsed.message)
        .or(parsed.error_description)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("HTTP {status}")
            } else {
                body.trim().to_string()
            }
        });

    BackendError {
        status: Some(status),
        code,
        message,
    }
}

/// Client for one backend project. Implements both [`AuthProvider`] and
/// [`ProfileStore`] since they share the session token.
pub struct HostedBackend {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    storage: Arc<dyn SessionStorage>,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

impl HostedBackend {
    pub fn new(config: &BackendConfig, storage: Arc<dyn SessionStorage>) -> Result<Self, AuthError> {
        let (Some(base_url), Some(anon_key)) = (config.base_url(), config.key()) else {
            return Err(AuthError::NotConfigured);
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("academia-backoffice/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AuthError::Provider(format!("Failed to build HTTP client: {e}")))?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            http,
            base_url: base_url.to_string(),
            anon_key: anon_key.to_string(),
            storage,
            session: RwLock::new(None),
            events,
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{PROFILES_TABLE}", self.base_url)
    }

    fn current_session(&self) -> Option<Session> {
        self.session.read().ok().and_then(|guard| guard.clone())
    }

    fn set_session(&self, session: Option<Session>) {
        if let Ok(mut guard) = self.session.write() {
            *guard = session;
        }
    }

    fn emit(&self, event: AuthEvent) {
        log::debug!("Auth event {}", event.name());
        // No receivers is fine
        let _ = self.events.send(event);
    }

    /// Request carrying the API key and the caller's bearer token
    /// (the anon key when signed out).
    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let bearer = self
            .current_session()
            .map_or_else(|| self.anon_key.clone(), |s| s.access_token);
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    async fn check(response: Response) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(parse_error(status.as_u16(), &body))
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, BackendError> {
        let response = Self::check(builder.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    async fn send_empty(&self, builder: RequestBuilder) -> Result<(), BackendError> {
        Self::check(builder.send().await?).await?;
        Ok(())
    }

    async fn persist(&self, session: &Session) {
        if let Err(e) = self.storage.save(session).await {
            log::warn!("Failed to persist session: {e}");
        }
    }

    async fn forget(&self) {
        self.set_session(None);
        if let Err(e) = self.storage.clear().await {
            log::warn!("Failed to clear persisted session: {e}");
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, BackendError> {
        let token: TokenResponse = self
            .send_json(
                self.http
                    .post(self.auth_url("token"))
                    .query(&[("grant_type", "refresh_token")])
                    .header("apikey", &self.anon_key)
                    .json(&json!({ "refresh_token": refresh_token })),
            )
            .await?;
        Ok(token.into_session())
    }
}

#[async_trait]
impl AuthProvider for HostedBackend {
    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        let candidate = match self.current_session() {
            Some(session) => Some(session),
            None => match self.storage.load().await {
                Ok(stored) => stored,
                Err(e) => {
                    log::warn!("Failed to read persisted session: {e}");
                    None
                }
            },
        };
        let Some(session) = candidate else {
            return Ok(None);
        };

        if !session.is_expired_at(Utc::now()) {
            self.set_session(Some(session.clone()));
            return Ok(Some(session));
        }

        log::info!("Session for {} expired, refreshing", session.user.id);
        match self.refresh(&session.refresh_token).await {
            Ok(fresh) => {
                self.persist(&fresh).await;
                self.set_session(Some(fresh.clone()));
                self.emit(AuthEvent::TokenRefreshed(fresh.clone()));
                Ok(Some(fresh))
            }
            Err(e) if e.is_unauthorized() || e.status == Some(400) => {
                log::info!("Persisted session could not be refreshed: {e}");
                self.forget().await;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignInData, BackendError> {
        let token: TokenResponse = self
            .send_json(
                self.http
                    .post(self.auth_url("token"))
                    .query(&[("grant_type", "password")])
                    .header("apikey", &self.anon_key)
                    .json(&json!({ "email": email, "password": password })),
            )
            .await?;

        let session = token.into_session();
        self.persist(&session).await;
        self.set_session(Some(session.clone()));
        self.emit(AuthEvent::SignedIn(session.clone()));

        Ok(SignInData {
            user: session.user.clone(),
            session,
        })
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let session = self.current_session();
        // Local state goes first; the server call only revokes the refresh token
        self.forget().await;
        self.emit(AuthEvent::SignedOut);

        let Some(session) = session else {
            return Ok(());
        };
        self.send_empty(
            self.http
                .post(self.auth_url("logout"))
                .header("apikey", &self.anon_key)
                .bearer_auth(&session.access_token),
        )
        .await
    }

    async fn get_user(&self) -> Result<Option<User>, BackendError> {
        let Some(session) = self.current_session() else {
            return Ok(None);
        };
        let user = self
            .send_json(
                self.http
                    .get(self.auth_url("user"))
                    .header("apikey", &self.anon_key)
                    .bearer_auth(&session.access_token),
            )
            .await?;
        Ok(Some(user))
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), BackendError> {
        let mut builder = self
            .http
            .post(self.auth_url("recover"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email }));
        if let Some(redirect_to) = redirect_to {
            builder = builder.query(&[("redirect_to", redirect_to)]);
        }
        self.send_empty(builder).await
    }
}

#[async_trait]
impl ProfileStore for HostedBackend {
    async fn exists(&self, id: &str) -> Result<bool, BackendError> {
        let filter = format!("eq.{id}");
        let rows: Vec<IdRow> = self
            .send_json(
                self.request(Method::GET, &self.table_url())
                    .query(&[("id", filter.as_str()), ("select", "id")]),
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn fetch(&self, id: &str) -> Result<Option<Profile>, BackendError> {
        let filter = format!("eq.{id}");
        let rows: Vec<Profile> = self
            .send_json(
                self.request(Method::GET, &self.table_url())
                    .query(&[("id", filter.as_str()), ("select", "*")]),
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, profile: &NewProfile) -> Result<Profile, BackendError> {
        let rows: Vec<Profile> = self
            .send_json(
                self.request(Method::POST, &self.table_url())
                    .header("Prefer", "return=representation")
                    .json(profile),
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::new("Insert returned no rows"))
    }

    async fn delete(&self, id: &str) -> Result<(), BackendError> {
        let filter = format!("eq.{id}");
        self.send_empty(
            self.request(Method::DELETE, &self.table_url())
                .query(&[("id", filter.as_str())]),
        )
        .await
    }

    async fn count_admins(&self) -> Result<usize, BackendError> {
        let filter = format!("eq.{}", Role::Admin.as_str());
        let rows: Vec<IdRow> = self
            .send_json(
                self.request(Method::GET, &self.table_url())
                    .query(&[("role", filter.as_str()), ("select", "id")]),
            )
            .await?;
        Ok(rows.len())
    }

    async fn set_role(&self, id: &str, role: Role) -> Result<Profile, BackendError> {
        let filter = format!("eq.{id}");
        let rows: Vec<Profile> = self
            .send_json(
                self.request(Method::PATCH, &self.table_url())
                    .query(&[("id", filter.as_str())])
                    .header("Prefer", "return=representation")
                    .json(&json!({ "role": role })),
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::new(format!("No profile row for {id}")))
    }
}
