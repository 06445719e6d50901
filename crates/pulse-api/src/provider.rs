//! Client for the external identity provider.
//!
//! The browser is sent to the provider's login page with a `redirect`
//! parameter; the provider sends it back with a `session_id` in the URL
//! fragment, which the frontend hands to `/auth/profile`. Resolving that id
//! is the only time a request handler talks to the provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

/// What the provider tells us about a resolved login.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSession {
    /// Stable subject id; the local user is keyed on it.
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
    pub session_token: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("identity provider rejected the session (HTTP {0})")]
    Rejected(u16),

    #[error("identity provider unreachable: {0}")]
    Unreachable(String),

    #[error("identity provider sent an invalid response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Where to send the browser to log in, returning to `redirect`.
    fn login_url(&self, redirect: &str) -> String;

    async fn resolve_session(&self, session_id: &str) -> Result<ProviderSession, ProviderError>;

    /// Best-effort remote logout.
    async fn revoke_session(&self, session_token: &str) -> Result<(), ProviderError>;
}

pub struct ProviderConfig {
    pub login_url: String,
    pub session_data_url: String,
    pub logout_url: Option<String>,
    pub timeout: Duration,
}

/// Reqwest-backed provider. Every call is bounded by the configured timeout.
pub struct HttpIdentityProvider {
    client: Client,
    login_url: Url,
    session_data_url: Url,
    logout_url: Option<Url>,
}

impl HttpIdentityProvider {
    pub fn new(config: ProviderConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            login_url: Url::parse(&config.login_url)?,
            session_data_url: Url::parse(&config.session_data_url)?,
            logout_url: config.logout_url.as_deref().map(Url::parse).transpose()?,
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    fn login_url(&self, redirect: &str) -> String {
        let mut url = self.login_url.clone();
        url.query_pairs_mut().append_pair("redirect", redirect);
        url.to_string()
    }

    async fn resolve_session(&self, session_id: &str) -> Result<ProviderSession, ProviderError> {
        let response = self
            .client
            .get(self.session_data_url.clone())
            .header("X-Session-ID", session_id)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_status_error(status));
        }

        let body = response.bytes().await.map_err(map_transport_error)?;
        parse_session(&body)
    }

    async fn revoke_session(&self, session_token: &str) -> Result<(), ProviderError> {
        let Some(url) = &self.logout_url else {
            return Ok(());
        };

        let response = self
            .client
            .post(url.clone())
            .header("X-Session-Token", session_token)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_status_error(status));
        }
        Ok(())
    }
}

fn map_transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Unreachable("request timed out".to_string())
    } else if e.is_decode() {
        ProviderError::Malformed(e.to_string())
    } else {
        ProviderError::Unreachable(e.to_string())
    }
}

fn map_status_error(status: StatusCode) -> ProviderError {
    if status.is_server_error() {
        ProviderError::Unreachable(format!("HTTP {}", status.as_u16()))
    } else {
        ProviderError::Rejected(status.as_u16())
    }
}

pub(crate) fn parse_session(body: &[u8]) -> Result<ProviderSession, ProviderError> {
    let session: ProviderSession = serde_json::from_slice(body)
        .map_err(|e| ProviderError::Malformed(format!("invalid session payload: {}", e)))?;

    if session.id.trim().is_empty() {
        return Err(ProviderError::Malformed("empty subject id".to_string()));
    }
    if session.session_token.trim().is_empty() {
        return Err(ProviderError::Malformed("empty session token".to_string()));
    }
    Ok(session)
}
