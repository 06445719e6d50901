use anyhow::anyhow;
use axum::{
    Extension, Json,
    extract::{Query, State},
    response::Redirect,
};
use chrono::Utc;
use serde::Deserialize;
use tower_cookies::{
    Cookie, Cookies,
    cookie::{SameSite, time},
};
use tracing::{info, warn};
use uuid::Uuid;

use pulse_db::{LoginOutcome, NewLogin, ProfileChanges};
use pulse_types::api::{
    AckResponse, LoginResponse, MeResponse, SetSessionRequest, UpdateProfileRequest,
};
use pulse_types::models::User;

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::middleware::{AuthUser, SESSION_COOKIE, current_user};
use crate::provider::ProviderError;
use crate::state::{AppState, AuthSettings, with_db};
use crate::validation;

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub redirect: Option<String>,
}

/// Sends the browser to the identity provider. The provider returns it to
/// `redirect`, which must be on the frontend's own origin.
pub async fn begin_login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Result<Redirect, ApiError> {
    let origin = state.auth.app_origin.trim_end_matches('/');
    let target = match query.redirect.as_deref().map(str::trim) {
        None | Some("") => format!("{}/profile", origin),
        Some(r) if same_origin(origin, r) => r.to_string(),
        Some(_) => {
            return Err(ApiError::invalid(
                "redirect",
                "must point at the application origin",
            ));
        }
    };

    Ok(Redirect::to(&state.provider.login_url(&target)))
}

fn same_origin(origin: &str, url: &str) -> bool {
    match url.strip_prefix(origin) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'),
        None => false,
    }
}

#[derive(Debug, Deserialize)]
pub struct CompleteLoginQuery {
    pub session_id: Option<String>,
}

/// Exchanges the provider's session id for a local session. Nothing is
/// written unless the provider vouches for the login.
pub async fn complete_login(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(query): Query<CompleteLoginQuery>,
) -> Result<Json<LoginResponse>, ApiError> {
    let session_id = query
        .session_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::invalid("session_id", "is required"))?;

    let profile = state.provider.resolve_session(session_id).await?;

    let now = Utc::now();
    let expires_at = now
        .checked_add_signed(state.auth.session_ttl)
        .ok_or_else(|| anyhow!("Session TTL {} overflows the clock", state.auth.session_ttl))?;
    let token = profile.session_token.clone();

    let outcome = with_db(&state, move |db| {
        db.record_login(&NewLogin {
            new_user_id: &Uuid::new_v4().to_string(),
            subject: &profile.id,
            email: &profile.email,
            name: &profile.name,
            picture: profile.picture.as_deref(),
            token: &profile.session_token,
            now,
            expires_at,
        })
    })
    .await?;

    let row = match outcome {
        LoginOutcome::Recorded(row) => row,
        LoginOutcome::TokenOwnedByOtherUser => {
            return Err(ProviderError::Malformed(
                "session token is already bound to another user".to_string(),
            )
            .into());
        }
    };

    let user = User::try_from(row)?;
    info!("User {} logged in", user.id);

    cookies.add(session_cookie(&token, &state.auth));

    let profile_complete = user.profile_complete();
    let redirect_to = if profile_complete { "/dashboard" } else { "/profile" };
    Ok(Json(LoginResponse {
        user,
        session_token: token,
        redirect_to: redirect_to.to_string(),
        profile_complete,
    }))
}

/// Sets the session cookie for a token the client already holds, e.g. after
/// the handshake ran on another origin.
pub async fn set_session(
    State(state): State<AppState>,
    cookies: Cookies,
    JsonBody(req): JsonBody<SetSessionRequest>,
) -> Result<Json<AckResponse>, ApiError> {
    let token = req
        .session_token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::invalid("session_token", "is required"))?;

    current_user(&state, token.clone(), Utc::now()).await?;

    cookies.add(session_cookie(&token, &state.auth));
    Ok(Json(AckResponse::new("Session set")))
}

pub async fn me(Extension(auth): Extension<AuthUser>) -> Json<MeResponse> {
    let profile_complete = auth.user.profile_complete();
    Json(MeResponse {
        user: auth.user,
        profile_complete,
    })
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(req): JsonBody<UpdateProfileRequest>,
) -> Result<Json<MeResponse>, ApiError> {
    let valid = validation::profile_update(req)?;
    let user_id = auth.user.id.to_string();

    let row = with_db(&state, move |db| {
        let changes = ProfileChanges {
            name: valid.name.as_deref(),
            role: valid.role.map(|r| r.as_str()),
            city: valid.city.as_deref(),
            phone: valid.phone.as_deref(),
            emergency_contact: valid.emergency_contact.as_deref(),
        };
        db.update_profile(&user_id, &changes)
    })
    .await?
    .ok_or(ApiError::NotAuthenticated)?;

    let user = User::try_from(row)?;
    let profile_complete = user.profile_complete();
    Ok(Json(MeResponse {
        user,
        profile_complete,
    }))
}

/// Ends the caller's session locally, then tells the provider. The local
/// logout stands even if the provider cannot be reached.
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    cookies: Cookies,
) -> Result<Json<AckResponse>, ApiError> {
    let token = auth.session_token.clone();
    with_db(&state, move |db| db.delete_session(&token)).await?;

    if let Err(e) = state.provider.revoke_session(&auth.session_token).await {
        warn!("Provider logout failed for user {}: {}", auth.user.id, e);
    }

    cookies.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());
    info!("User {} logged out", auth.user.id);
    Ok(Json(AckResponse::new("Logged out successfully")))
}

fn session_cookie(token: &str, settings: &AuthSettings) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .secure(settings.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(settings.session_ttl.num_seconds()))
        .build()
}
