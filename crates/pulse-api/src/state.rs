use std::sync::Arc;

use anyhow::anyhow;

use pulse_db::Database;

use crate::error::ApiError;
use crate::provider::IdentityProvider;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub provider: Arc<dyn IdentityProvider>,
    pub auth: AuthSettings,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Origin of the frontend, e.g. `https://pulse.example.com`. Login
    /// redirects are only allowed back to this origin.
    pub app_origin: String,
    pub session_ttl: chrono::Duration,
    pub cookie_secure: bool,
}

impl AppStateInner {
    pub fn new(db: Database, provider: Arc<dyn IdentityProvider>, auth: AuthSettings) -> AppState {
        Arc::new(Self { db, provider, auth })
    }
}

/// Runs blocking database work off the async executor.
pub async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| ApiError::Internal(anyhow!("DB task failed: {}", e)))?
        .map_err(ApiError::Internal)
}
