//! Thin client for the Supabase REST (`/rest/v1`) and auth (`/auth/v1`) APIs.
//!
//! The client keeps at most one auth session in memory and mirrors it to a
//! [`SessionStore`] so a service-worker restart does not sign the user out.
//! Requests use the session's access token when there is one and the anon key
//! otherwise.

use std::cell::RefCell;
use std::fmt;

use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::save_record::{SaveRecord, StoredSave};

/// Seconds of slack before `expires_at` at which the session is refreshed
const EXPIRY_MARGIN_SECS: i64 = 30;

/// Errors from a Supabase call
#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    /// The request never produced a response.
    Network(String),
    /// Supabase answered with a non-success status.
    Api { status: u16, message: String },
    /// The response body did not have the expected shape.
    Decode(String),
    /// An operation needed a signed-in user.
    NotSignedIn,
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Network(msg) => write!(f, "{}", msg),
            BackendError::Api { message, .. } => write!(f, "{}", message),
            BackendError::Decode(msg) => write!(f, "Unexpected response: {}", msg),
            BackendError::NotSignedIn => write!(f, "Not signed in"),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Network(err.to_string())
        }
    }
}

/// Authenticated user as returned by GoTrue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Persisted auth session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

impl Session {
    fn is_expired(&self, now_secs: i64) -> bool {
        self.expires_at
            .is_some_and(|at| now_secs + EXPIRY_MARGIN_SECS >= at)
    }
}

/// Ordering and paging for a select
#[derive(Debug, Clone, PartialEq)]
pub struct SelectOptions {
    /// PostgREST order expression, e.g. `created_at.desc`
    pub order: Option<String>,
    pub limit: Option<u32>,
}

impl SelectOptions {
    pub fn recent(limit: u32) -> SelectOptions {
        SelectOptions {
            order: Some("created_at.desc".to_string()),
            limit: Some(limit),
        }
    }
}

/// The calls the extension makes against its backend.
#[allow(async_fn_in_trait)]
pub trait Backend {
    async fn insert(&self, table: &str, record: &SaveRecord) -> Result<(), BackendError>;
    async fn select(
        &self,
        table: &str,
        options: &SelectOptions,
    ) -> Result<Vec<StoredSave>, BackendError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<(), BackendError>;
    async fn sign_out(&self) -> Result<(), BackendError>;
    async fn get_user(&self) -> Result<Option<User>, BackendError>;
}

/// Where the session survives between service-worker lifetimes.
#[allow(async_fn_in_trait)]
pub trait SessionStore {
    async fn load(&self) -> Result<Option<Session>, String>;
    async fn save(&self, session: Option<&Session>) -> Result<(), String>;
}

pub struct SupabaseClient<S> {
    base_url: String,
    anon_key: String,
    http: Client,
    session: RefCell<Option<Session>>,
    store: S,
}

impl<S: SessionStore> SupabaseClient<S> {
    pub fn new(url: &str, anon_key: &str, store: S) -> SupabaseClient<S> {
        SupabaseClient {
            base_url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            http: Client::new(),
            session: RefCell::new(None),
            store,
        }
    }

    /// Restore a previously persisted session, if any.
    pub async fn init(&self) {
        match self.store.load().await {
            Ok(session) => {
                if let Some(s) = &session {
                    log::debug!("Restored session for {}", s.user.id);
                }
                *self.session.borrow_mut() = session;
            }
            Err(e) => log::warn!("Could not restore session: {}", e),
        }
    }

    fn current_session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    async fn set_session(&self, session: Option<Session>) {
        if let Err(e) = self.store.save(session.as_ref()).await {
            log::warn!("Could not persist session: {}", e);
        }
        *self.session.borrow_mut() = session;
    }

    /// Bearer token for data calls, refreshing an expired session first.
    async fn access_token(&self) -> String {
        let Some(session) = self.current_session() else {
            return self.anon_key.clone();
        };

        if !session.is_expired(now_secs()) {
            return session.access_token;
        }

        match self.refresh(&session).await {
            Ok(fresh) => {
                let token = fresh.access_token.clone();
                self.set_session(Some(fresh)).await;
                token
            }
            Err(e) => {
                log::warn!("Session refresh failed, signing out locally: {}", e);
                self.set_session(None).await;
                self.anon_key.clone()
            }
        }
    }

    async fn refresh(&self, session: &Session) -> Result<Session, BackendError> {
        let refresh_token = session
            .refresh_token
            .as_deref()
            .ok_or(BackendError::NotSignedIn)?;

        let response = self.refresh_request(refresh_token)?.send().await?;
        let response = check_status(response).await?;
        Ok(response.json::<Session>().await?)
    }

    fn with_api_key(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("apikey", &self.anon_key)
    }

    fn insert_request(
        &self,
        table: &str,
        record: &SaveRecord,
        token: &str,
    ) -> Result<RequestBuilder, BackendError> {
        let url = rest_url(&self.base_url, table)?;
        Ok(self
            .with_api_key(self.http.post(url))
            .bearer_auth(token)
            .header("Prefer", "return=minimal")
            .json(record))
    }

    fn select_request(
        &self,
        table: &str,
        options: &SelectOptions,
        token: &str,
    ) -> Result<RequestBuilder, BackendError> {
        let url = select_url(&self.base_url, table, options)?;
        Ok(self.with_api_key(self.http.get(url)).bearer_auth(token))
    }

    fn sign_in_request(&self, email: &str, password: &str) -> Result<RequestBuilder, BackendError> {
        let url = auth_url(&self.base_url, "token", Some(("grant_type", "password")))?;
        Ok(self
            .with_api_key(self.http.post(url))
            .json(&serde_json::json!({ "email": email, "password": password })))
    }

    fn refresh_request(&self, refresh_token: &str) -> Result<RequestBuilder, BackendError> {
        let url = auth_url(&self.base_url, "token", Some(("grant_type", "refresh_token")))?;
        Ok(self
            .with_api_key(self.http.post(url))
            .json(&serde_json::json!({ "refresh_token": refresh_token })))
    }

    fn sign_out_request(&self, access_token: &str) -> Result<RequestBuilder, BackendError> {
        let url = auth_url(&self.base_url, "logout", None)?;
        Ok(self.with_api_key(self.http.post(url)).bearer_auth(access_token))
    }
}

impl<S: SessionStore> Backend for SupabaseClient<S> {
    async fn insert(&self, table: &str, record: &SaveRecord) -> Result<(), BackendError> {
        let token = self.access_token().await;
        let response = self.insert_request(table, record, &token)?.send().await?;

        check_status(response).await?;
        log::info!("Inserted into {}", table);
        Ok(())
    }

    async fn select(
        &self,
        table: &str,
        options: &SelectOptions,
    ) -> Result<Vec<StoredSave>, BackendError> {
        let token = self.access_token().await;
        let response = self.select_request(table, options, &token)?.send().await?;

        let response = check_status(response).await?;
        Ok(response.json::<Vec<StoredSave>>().await?)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<(), BackendError> {
        let response = self.sign_in_request(email, password)?.send().await?;

        let response = check_status(response).await?;
        let session = response.json::<Session>().await?;
        log::info!("Signed in as {}", session.user.id);
        self.set_session(Some(session)).await;
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        if let Some(session) = self.current_session() {
            let result = self.sign_out_request(&session.access_token)?.send().await;

            // The local session is dropped whatever the server says.
            match result {
                Ok(response) => {
                    if let Err(e) = check_status(response).await {
                        log::warn!("Remote sign-out failed: {}", e);
                    }
                }
                Err(e) => log::warn!("Remote sign-out failed: {}", e),
            }
        }

        self.set_session(None).await;
        Ok(())
    }

    async fn get_user(&self) -> Result<Option<User>, BackendError> {
        Ok(self.current_session().map(|s| s.user))
    }
}

/// `{base}/rest/v1/{table}`
pub fn rest_url(base_url: &str, table: &str) -> Result<Url, BackendError> {
    parse_url(&format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table))
}

/// `{base}/rest/v1/{table}?select=*&order=..&limit=..`
pub fn select_url(
    base_url: &str,
    table: &str,
    options: &SelectOptions,
) -> Result<Url, BackendError> {
    let mut url = rest_url(base_url, table)?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("select", "*");
        if let Some(order) = &options.order {
            query.append_pair("order", order);
        }
        if let Some(limit) = options.limit {
            query.append_pair("limit", &limit.to_string());
        }
    }
    Ok(url)
}

/// `{base}/auth/v1/{endpoint}` with an optional query pair
pub fn auth_url(
    base_url: &str,
    endpoint: &str,
    query: Option<(&str, &str)>,
) -> Result<Url, BackendError> {
    let mut url = parse_url(&format!(
        "{}/auth/v1/{}",
        base_url.trim_end_matches('/'),
        endpoint
    ))?;
    if let Some((key, value)) = query {
        url.query_pairs_mut().append_pair(key, value);
    }
    Ok(url)
}

fn parse_url(raw: &str) -> Result<Url, BackendError> {
    Url::parse(raw).map_err(|e| BackendError::Network(format!("Invalid backend url {}: {}", raw, e)))
}

async fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Api {
        status: status.as_u16(),
        message: error_message(&body, status.as_u16()),
    })
}

/// Pull a readable message out of a Supabase error body.
pub fn error_message(body: &str, status: u16) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|key| value.get(key).and_then(|v| v.as_str()).map(str::to_string))
        });

    match from_json {
        Some(msg) => msg,
        None if !body.trim().is_empty() => body.trim().to_string(),
        None => format!("Request failed with status {}", status),
    }
}

#[cfg(target_arch = "wasm32")]
fn now_secs() -> i64 {
    (js_sys::Date::now() / 1000.0) as i64
}

#[cfg(not(target_arch = "wasm32"))]
fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
