// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Registration, login, and session endpoints.

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderName, StatusCode};
use axum::response::AppendHeaders;
use axum::Json;
use chrono::{DateTime, Utc};
use tracing::info;

use super::cookies::{clear_session_cookies, set_session_cookies, REFRESH_COOKIE};
use crate::auth::{Auth, Identity};
use crate::error::ApiError;
use crate::models::{
    LoginRequest, MessageResponse, RefreshRequest, RegisterRequest, TokenPairResponse,
};
use crate::session::lockout::authenticate_password;
use crate::session::password::{hash_password, validate_email, validate_password};
use crate::session::{refresh, reset};
use crate::state::AppState;
use crate::store::{InMemoryStore, OneTimeTokenKind, StoreError};

type SessionResponse = (
    StatusCode,
    AppendHeaders<[(HeaderName, String); 2]>,
    Json<TokenPairResponse>,
);

/// Best-effort client address for rate limiting.
///
/// Deployments sit behind a proxy, so the first `X-Forwarded-For` entry
/// is the practical source. Absence maps every client to one bucket,
/// which throttles harder rather than softer.
pub(super) fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Mint an access/refresh pair for a user. Caller holds the write lock.
pub(super) fn issue_token_pair(
    state: &AppState,
    store: &mut InMemoryStore,
    user_id: i64,
    client_ip: Option<&str>,
    now: DateTime<Utc>,
) -> Result<TokenPairResponse, ApiError> {
    let access_ttl = state.settings.access_token_ttl();
    let access_token = state
        .codec
        .issue(&user_id.to_string(), access_ttl, now)
        .map_err(|e| {
            tracing::error!(error = %e, "access token issuance failed");
            ApiError::internal("Internal error")
        })?;
    let refresh_token = refresh::issue(
        store,
        user_id,
        state.settings.refresh_token_ttl(),
        client_ip,
        now,
    );

    Ok(TokenPairResponse {
        access_token,
        refresh_token,
        token_type: "bearer",
        expires_in: access_ttl.num_seconds(),
    })
}

fn session_response(state: &AppState, status: StatusCode, pair: TokenPairResponse) -> SessionResponse {
    let [access, refresh] = set_session_cookies(
        &pair.access_token,
        pair.expires_in,
        &pair.refresh_token,
        state.settings.refresh_token_ttl().num_seconds(),
    );
    (
        status,
        AppendHeaders([(SET_COOKIE, access), (SET_COOKIE, refresh)]),
        Json(pair),
    )
}

/// Register a new account.
///
/// Returns a live session. The response for an already-registered email
/// is indistinguishable from any other validation failure.
#[utoipa::path(
    post,
    path = "/v1/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, session issued", body = TokenPairResponse),
        (status = 400, description = "Validation failed"),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RegisterRequest>,
) -> Result<SessionResponse, ApiError> {
    if !body.terms_accepted {
        return Err(ApiError::bad_request(
            "The terms of service must be accepted.",
        ));
    }
    validate_email(&body.email).map_err(ApiError::from)?;
    validate_password(&body.password).map_err(ApiError::from)?;
    let email = crate::session::password::normalize_email(&body.email);
    let password_hash = hash_password(&body.password).map_err(ApiError::from)?;

    let now = Utc::now();
    let mut store = state.store.write().await;

    let user = match store.create_user(&email, &password_hash, body.full_name.as_deref(), now) {
        Ok(user) => user,
        Err(StoreError::DuplicateEmail) => {
            // Same wording as any other rejection; registration must not
            // double as an email-existence oracle.
            info!("registration refused: email already registered");
            return Err(ApiError::bad_request(
                "Unable to register with the provided details.",
            ));
        }
        Err(e) => {
            tracing::error!(error = %e, "user creation failed");
            return Err(ApiError::internal("Internal error"));
        }
    };

    if let Some(token) = reset::request(
        &mut store,
        &user.email,
        OneTimeTokenKind::EmailVerification,
        now,
    ) {
        deliver_one_time_token(&user.email, "email verification", &token);
    }

    let pair = issue_token_pair(&state, &mut store, user.id, Some(&client_ip(&headers)), now)?;
    info!(user_id = user.id, "account registered");
    Ok(session_response(&state, StatusCode::CREATED, pair))
}

/// Log in with email and password.
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = TokenPairResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Throttled"),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<SessionResponse, ApiError> {
    let ip = client_ip(&headers);
    let now = Utc::now();
    let mut store = state.store.write().await;

    let user = authenticate_password(
        &mut store,
        &state.lockout,
        &body.email,
        &body.password,
        &ip,
        now,
    )
    .map_err(|e| {
        info!(kind = e.kind(), "login refused");
        ApiError::from(e)
    })?;

    let pair = issue_token_pair(&state, &mut store, user.id, Some(&ip), now)?;
    info!(user_id = user.id, "login");
    Ok(session_response(&state, StatusCode::OK, pair))
}

/// Rotate a refresh token for a new session.
///
/// The token comes from the body or the `refresh_token` cookie. The old
/// token is consumed atomically; presenting it again fails.
#[utoipa::path(
    post,
    path = "/v1/auth/refresh",
    tag = "Auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Session rotated", body = TokenPairResponse),
        (status = 400, description = "Unknown, expired, or replayed token"),
    )
)]
pub async fn refresh_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> Result<SessionResponse, ApiError> {
    let token = presented_refresh_token(&headers, body)
        .ok_or_else(|| ApiError::bad_request("Invalid or expired token."))?;

    let now = Utc::now();
    let mut store = state.store.write().await;

    let (new_refresh, user_id) = refresh::rotate(
        &mut store,
        &token,
        state.settings.refresh_token_ttl(),
        now,
    )
    .map_err(ApiError::from)?;

    let access_ttl = state.settings.access_token_ttl();
    let access_token = state
        .codec
        .issue(&user_id.to_string(), access_ttl, now)
        .map_err(|e| {
            tracing::error!(error = %e, "access token issuance failed");
            ApiError::internal("Internal error")
        })?;

    let pair = TokenPairResponse {
        access_token,
        refresh_token: new_refresh,
        token_type: "bearer",
        expires_in: access_ttl.num_seconds(),
    };
    Ok(session_response(&state, StatusCode::OK, pair))
}

/// Log out the current session.
///
/// Idempotent: revoking an already-revoked or unknown token still
/// clears the cookies and succeeds.
#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    tag = "Auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Session ended", body = MessageResponse),
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> (
    AppendHeaders<[(HeaderName, String); 2]>,
    Json<MessageResponse>,
) {
    if let Some(token) = presented_refresh_token(&headers, body) {
        refresh::revoke(&mut *state.store.write().await, &token);
    }

    let [access, refresh] = clear_session_cookies();
    (
        AppendHeaders([(SET_COOKIE, access), (SET_COOKIE, refresh)]),
        Json(MessageResponse::new("Logged out.")),
    )
}

/// Log out every session of the authenticated user.
#[utoipa::path(
    post,
    path = "/v1/auth/logout-all",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All sessions ended", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn logout_all(
    State(state): State<AppState>,
    Auth(identity): Auth,
) -> Result<
    (
        AppendHeaders<[(HeaderName, String); 2]>,
        Json<MessageResponse>,
    ),
    ApiError,
> {
    let Identity::User(user) = identity else {
        // Federated sessions have no local refresh tokens to revoke.
        return Err(ApiError::bad_request(
            "No first-party sessions for this identity.",
        ));
    };

    refresh::revoke_all(&mut *state.store.write().await, user.user_id);

    let [access, refresh] = clear_session_cookies();
    Ok((
        AppendHeaders([(SET_COOKIE, access), (SET_COOKIE, refresh)]),
        Json(MessageResponse::new("Logged out everywhere.")),
    ))
}

/// Refresh token from the request body, falling back to the cookie.
fn presented_refresh_token(
    headers: &HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> Option<String> {
    if let Some(Json(RefreshRequest {
        refresh_token: Some(token),
    })) = body
    {
        return Some(token);
    }

    headers
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| {
            let (k, v) = pair.trim().split_once('=')?;
            (k == REFRESH_COOKIE).then(|| v.to_string())
        })
        .next()
}

/// Hand a one-time token to the delivery channel.
///
/// There is no mailer wired up; production deployments front this with
/// the platform's notification service. Dev builds log the raw token so
/// flows can be exercised end to end.
pub(super) fn deliver_one_time_token(email: &str, purpose: &str, token: &str) {
    #[cfg(feature = "dev")]
    info!(email, purpose, token, "one-time token issued (dev delivery)");
    #[cfg(not(feature = "dev"))]
    {
        let _ = (email, token);
        info!(purpose, "one-time token issued");
    }
}
