//! Owner auth routes: email/password, Google sign-in, sessions, WS tickets.

use axum::extract::{FromRef, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration;

use super::error_response;
use crate::services::owner::{self, NewOwner, OwnerError, OwnerProfile};
use crate::services::{oauth, session};
use crate::state::AppState;

pub(crate) const COOKIE_NAME: &str = "session_token";
const OAUTH_STATE_COOKIE_NAME: &str = "oauth_state";

/// Where owners land after signing in through Google.
const DASHBOARD_PATH: &str = "/owner/dashboard";

// =============================================================================
// COOKIES
// =============================================================================

pub(crate) fn build_cookie(name: &'static str, value: String, secure: bool, max_age: Duration) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(max_age)
        .build()
}

pub(crate) fn expired_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    build_cookie(name, String::new(), secure, Duration::ZERO)
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    build_cookie(COOKIE_NAME, token, state.config.cookie_secure, Duration::hours(state.config.session_ttl_hours))
}

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated owner extracted from the session cookie.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub owner: session::SessionOwner,
    pub token: String,
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar.get(COOKIE_NAME).map(Cookie::value).unwrap_or_default();
        if token.is_empty() {
            return Err(StatusCode::UNAUTHORIZED);
        }

        let app_state = AppState::from_ref(state);
        let owner = session::validate_session(&app_state.pool, token)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "session validation failed");
                StatusCode::INTERNAL_SERVER_ERROR
            })?
            .ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(Self { owner, token: token.to_owned() })
    }
}

pub(crate) fn owner_error_to_status(err: &OwnerError) -> StatusCode {
    match err {
        OwnerError::EmailTaken => StatusCode::CONFLICT,
        OwnerError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        OwnerError::NotFound(_) => StatusCode::NOT_FOUND,
        OwnerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        OwnerError::Hash(_) | OwnerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn owner_error(err: &OwnerError) -> Response {
    error_response(owner_error_to_status(err), err)
}

// =============================================================================
// EMAIL + PASSWORD
// =============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

async fn start_session(state: &AppState, jar: CookieJar, profile: OwnerProfile, status: StatusCode) -> Response {
    match session::create_session(&state.pool, profile.id, state.config.session_ttl_hours).await {
        Ok(token) => (status, jar.add(session_cookie(state, token)), Json(profile)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, owner_id = %profile.id, "session creation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session").into_response()
        }
    }
}

/// `POST /api/auth/signup`: create an owner account and sign it in.
pub async fn signup(State(state): State<AppState>, jar: CookieJar, Json(body): Json<NewOwner>) -> Response {
    let profile = match owner::signup(&state.pool, &body).await {
        Ok(profile) => profile,
        Err(e) => return owner_error(&e),
    };
    tracing::info!(owner_id = %profile.id, "owner signed up");
    start_session(&state, jar, profile, StatusCode::CREATED).await
}

/// `POST /api/auth/login`: verify credentials and set the session cookie.
pub async fn login(State(state): State<AppState>, jar: CookieJar, Json(body): Json<LoginRequest>) -> Response {
    let owner_id = match owner::login(&state.pool, &body.email, &body.password).await {
        Ok(id) => id,
        Err(e) => {
            if matches!(e, OwnerError::InvalidCredentials) {
                tracing::warn!("owner login rejected");
            }
            return owner_error(&e);
        }
    };
    let profile = match owner::get_owner(&state.pool, owner_id).await {
        Ok(profile) => profile,
        Err(e) => return owner_error(&e),
    };
    start_session(&state, jar, profile, StatusCode::OK).await
}

/// `GET /api/auth/me`: return the signed-in owner.
pub async fn me(auth: AuthUser) -> Json<session::SessionOwner> {
    Json(auth.owner)
}

/// `POST /api/auth/logout`: delete session, clear cookie.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    if let Err(e) = session::delete_session(&state.pool, &auth.token).await {
        tracing::warn!(error = %e, "session delete failed during logout");
    }
    let jar = CookieJar::new().add(expired_cookie(COOKIE_NAME, state.config.cookie_secure));
    (jar, StatusCode::NO_CONTENT)
}

#[derive(Serialize, Deserialize)]
pub struct TicketResponse {
    pub ticket: String,
}

/// `POST /api/auth/ws-ticket`: create a one-time ticket for the feed socket.
pub async fn ws_ticket(State(state): State<AppState>, auth: AuthUser) -> Result<Json<TicketResponse>, StatusCode> {
    let ticket = session::create_ws_ticket(&state.pool, auth.owner.id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "ws ticket creation failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(Json(TicketResponse { ticket }))
}

// =============================================================================
// GOOGLE SIGN-IN
// =============================================================================

/// `GET /auth/google`: redirect to the Google consent page.
pub async fn google_redirect(State(state): State<AppState>) -> Response {
    let Some(config) = &state.google else {
        return (StatusCode::SERVICE_UNAVAILABLE, "Google sign-in not configured").into_response();
    };

    let oauth_state = session::generate_token();
    let cookie = build_cookie(
        OAUTH_STATE_COOKIE_NAME,
        oauth_state.clone(),
        state.config.cookie_secure,
        Duration::minutes(10),
    );

    let jar = CookieJar::new().add(cookie);
    (jar, Redirect::temporary(&config.authorize_url(&oauth_state))).into_response()
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    code: String,
    state: Option<String>,
}

/// `GET /auth/google/callback`: exchange code, upsert owner, set cookie,
/// redirect to the dashboard.
pub async fn google_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackQuery>,
) -> Response {
    let Some(config) = &state.google else {
        return (StatusCode::SERVICE_UNAVAILABLE, "Google sign-in not configured").into_response();
    };
    let secure = state.config.cookie_secure;

    // Verify OAuth CSRF state from cookie.
    let Some(callback_state) = params.state.as_deref() else {
        return (StatusCode::BAD_REQUEST, "missing oauth state").into_response();
    };
    let expected_state = jar
        .get(OAUTH_STATE_COOKIE_NAME)
        .map(Cookie::value)
        .unwrap_or_default();
    if expected_state.is_empty() || expected_state != callback_state {
        return (StatusCode::UNAUTHORIZED, "invalid oauth state").into_response();
    }

    let access_token = match oauth::exchange_code(config, &params.code).await {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(error = %e, "oauth code exchange failed");
            return (StatusCode::BAD_GATEWAY, "OAuth code exchange failed").into_response();
        }
    };

    let profile = match oauth::fetch_profile(&access_token).await {
        Ok(p) => p,
        Err(oauth::OAuthError::UnverifiedEmail) => {
            return (StatusCode::FORBIDDEN, "Google account email is not verified").into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "google profile fetch failed");
            return (StatusCode::BAD_GATEWAY, "Failed to fetch Google profile").into_response();
        }
    };

    let owner_id = match owner::upsert_oauth_owner(&state.pool, &profile.into()).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(error = %e, "owner upsert failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create account").into_response();
        }
    };

    let token = match session::create_session(&state.pool, owner_id, state.config.session_ttl_hours).await {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(error = %e, "session creation failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session").into_response();
        }
    };

    tracing::info!(%owner_id, "owner signed in with google");
    let jar = jar
        .add(session_cookie(&state, token))
        .add(expired_cookie(OAUTH_STATE_COOKIE_NAME, secure));
    (jar, Redirect::temporary(DASHBOARD_PATH)).into_response()
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
