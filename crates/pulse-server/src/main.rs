mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{
    HeaderValue, Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use pulse_api::provider::{HttpIdentityProvider, ProviderConfig};
use pulse_api::{AppStateInner, AuthSettings};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulse=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    if !config.cookie_secure {
        warn!("PULSE_COOKIE_SECURE is off; session cookies will be sent over plain HTTP");
    }

    // Init database
    let db = pulse_db::Database::open(&config.db_path)?;
    let purged = db.delete_expired_sessions(chrono::Utc::now())?;
    if purged > 0 {
        info!("Purged {} expired sessions", purged);
    }

    let provider = HttpIdentityProvider::new(ProviderConfig {
        login_url: config.auth_login_url.clone(),
        session_data_url: config.auth_session_url.clone(),
        logout_url: config.auth_logout_url.clone(),
        timeout: config.auth_timeout,
    })
    .context("Invalid identity provider configuration")?;

    let state = AppStateInner::new(
        db,
        Arc::new(provider),
        AuthSettings {
            app_origin: config.app_origin.clone(),
            session_ttl: chrono::Duration::days(config.session_ttl_days),
            cookie_secure: config.cookie_secure,
        },
    );

    // Cookies require credentialed CORS, which rules out a wildcard origin.
    let origins = config
        .cors_origins
        .iter()
        .map(|o| HeaderValue::from_str(o).with_context(|| format!("Invalid CORS origin '{}'", o)))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    let app = pulse_api::router(state).layer(cors);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Pulse server listening on {}", addr);
    info!("Sessions last {} days", config.session_ttl_days);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
