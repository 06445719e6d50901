use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use tower_cookies::Cookies;
use tracing::debug;

use pulse_db::SessionLookup;
use pulse_types::models::User;

use crate::error::ApiError;
use crate::state::{AppState, with_db};

pub const SESSION_COOKIE: &str = "session_token";

/// The caller of a protected route, resolved once by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub session_token: String,
}

/// Resolves an `Authorization: Bearer` header (or the session cookie) to a
/// user and attaches it to the request. Anything short of a live session
/// with an existing user is a 401.
pub async fn require_auth(
    State(state): State<AppState>,
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = session_token(&cookies, req.headers()).ok_or(ApiError::NotAuthenticated)?;
    let user = current_user(&state, token.clone(), Utc::now()).await?;

    req.extensions_mut().insert(AuthUser {
        user,
        session_token: token,
    });
    Ok(next.run(req).await)
}

/// An `Authorization: Bearer` header wins over the cookie.
fn session_token(cookies: &Cookies, headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    if bearer.is_some() {
        return bearer;
    }

    cookies
        .get(SESSION_COOKIE)
        .map(|c| c.value().trim().to_string())
        .filter(|t| !t.is_empty())
}

pub async fn current_user(
    state: &AppState,
    token: String,
    now: DateTime<Utc>,
) -> Result<User, ApiError> {
    let row = with_db(state, move |db| match db.resolve_session(&token, now)? {
        SessionLookup::Active(session) => db.get_user_by_id(&session.user_id),
        SessionLookup::Expired | SessionLookup::Missing => Ok(None),
    })
    .await?;

    let Some(row) = row else {
        debug!("Rejected request with no live session");
        return Err(ApiError::NotAuthenticated);
    };
    Ok(User::try_from(row)?)
}
